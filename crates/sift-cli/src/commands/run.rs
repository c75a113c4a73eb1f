use anyhow::Result;
use tracing::info;

use sift_runtime::{RefinementPlan, RuntimeConfig};

use super::{
    arbiter, load_criteria, load_gold, log_usage, open_pipeline, print_json, print_refinement,
    write_criteria,
};
use crate::cli::RunArgs;

pub async fn run(mut config: RuntimeConfig, args: RunArgs) -> Result<()> {
    if let Some(reset) = args.reset {
        config.results.reset = reset;
    }
    config.optimizer.interactive |= args.refine.interactive;
    let mut criteria = load_criteria(&args.corpus.criteria)?;
    let gold = load_gold(&args.gold)?;

    let (pipeline, budget) = open_pipeline(&config, &args.corpus, gold).await?;
    let plan = RefinementPlan::new(args.refine.strategy).with_annotations(args.refine.annotations.clone());
    let mut arbiter = arbiter(plan.strategy, config.optimizer.interactive);

    info!(rounds = args.rounds, strategy = %plan.strategy, "Starting pipeline");
    let reports = pipeline
        .run(args.rounds, &plan, &mut criteria, &mut *arbiter)
        .await?;
    log_usage(&budget);

    if args.json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            println!(
                "Round {}: screened {} ({} indeterminate, {} failed), MCC {:.3}, F1 {:.3}",
                report.round,
                report.screening.screened,
                report.screening.indeterminate,
                report.screening.failed,
                report.evaluation.metrics.mcc,
                report.evaluation.metrics.f1
            );
            print_refinement(&report.refinement);
        }
    }
    write_criteria(&criteria, &args.refine)
}
