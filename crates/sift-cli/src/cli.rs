use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sift_runtime::Strategy;

#[derive(Parser, Debug)]
#[command(
    name = "sift",
    version,
    about = "Screen documents against review criteria and refine the criteria"
)]
pub struct Cli {
    /// Runtime configuration (YAML); defaults apply when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Screen every selected document once
    Screen(ScreenArgs),
    /// Score stored verdicts against the gold standard
    Evaluate(EvaluateArgs),
    /// Refine weak criteria from the stored verdicts
    Optimize(OptimizeArgs),
    /// Repeat screen, evaluate and refine
    Run(RunArgs),
    /// Check criteria and configuration files
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Criteria file (YAML or JSON)
    #[arg(long)]
    pub criteria: PathBuf,

    /// Pre-chunked corpus: {"documents": {id: [chunk, ...]}}
    #[arg(long)]
    pub corpus: PathBuf,

    /// Verdict file; overrides results.path
    #[arg(long)]
    pub results: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RefineArgs {
    #[arg(long, default_value_t = Strategy::Automated)]
    pub strategy: Strategy,

    /// Ask on the console instead of deciding automatically
    #[arg(long, default_value_t = false)]
    pub interactive: bool,

    /// Expert notes passed to rewrite prompts
    #[arg(long)]
    pub annotations: Option<String>,

    /// Where to write the refined criteria; prints YAML when omitted
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ScreenArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Clear stored verdicts first; overrides results.reset
    #[arg(long)]
    pub reset: Option<bool>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub criteria: PathBuf,

    /// Gold standard labels: {id: true | false | null}
    #[arg(long)]
    pub gold: PathBuf,

    #[arg(long)]
    pub results: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[arg(long)]
    pub gold: PathBuf,

    #[command(flatten)]
    pub refine: RefineArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[arg(long)]
    pub gold: PathBuf,

    #[arg(long, default_value_t = 1)]
    pub rounds: usize,

    #[command(flatten)]
    pub refine: RefineArgs,

    #[arg(long)]
    pub reset: Option<bool>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Criteria files to check
    pub criteria: Vec<PathBuf>,
}
