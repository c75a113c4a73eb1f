mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(err) = run(cli).await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let config = commands::load_config(config_path)?;

    match cli.command {
        Commands::Screen(args) => commands::screen::run(config, args).await,
        Commands::Evaluate(args) => commands::evaluate::run(config, args),
        Commands::Optimize(args) => commands::optimize::run(config, args).await,
        Commands::Run(args) => commands::run::run(config, args).await,
        Commands::Validate(args) => commands::validate::run(config_path, &config, args),
    }
}

fn init_tracing(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
