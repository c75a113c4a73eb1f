use anyhow::{Context, Result};
use tracing::info;

use sift_runtime::{RefinementPlan, RuntimeConfig};

use super::{
    arbiter, load_criteria, load_gold, log_usage, open_pipeline, print_json, print_refinement,
    write_criteria,
};
use crate::cli::OptimizeArgs;

pub async fn run(mut config: RuntimeConfig, args: OptimizeArgs) -> Result<()> {
    config.optimizer.interactive |= args.refine.interactive;
    let mut criteria = load_criteria(&args.corpus.criteria)?;
    let gold = load_gold(&args.gold)?;

    let (pipeline, budget) = open_pipeline(&config, &args.corpus, gold).await?;
    let evaluation = pipeline
        .evaluate(&criteria)
        .context("optimize needs verdicts from a previous screening round")?;
    info!(mcc = evaluation.metrics.mcc, "Current screening quality");

    let plan = RefinementPlan::new(args.refine.strategy).with_annotations(args.refine.annotations.clone());
    let mut arbiter = arbiter(plan.strategy, config.optimizer.interactive);
    let report = pipeline
        .refine(&plan, &mut criteria, &evaluation.importance_vector(), &mut *arbiter)
        .await?;
    log_usage(&budget);

    if args.json {
        print_json(&report)?;
    } else {
        print_refinement(&report);
    }
    write_criteria(&criteria, &args.refine)
}
