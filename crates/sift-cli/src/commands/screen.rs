use anyhow::Result;
use tracing::info;

use sift_core::GoldStandard;
use sift_runtime::RuntimeConfig;

use super::{load_criteria, log_usage, open_pipeline, print_json};
use crate::cli::ScreenArgs;

pub async fn run(mut config: RuntimeConfig, args: ScreenArgs) -> Result<()> {
    if let Some(reset) = args.reset {
        config.results.reset = reset;
    }
    let criteria = load_criteria(&args.corpus.criteria)?;
    info!(criteria = criteria.len(), review = %criteria.name, "Loaded criteria");

    let (pipeline, budget) = open_pipeline(&config, &args.corpus, GoldStandard::default()).await?;
    let summary = pipeline.screen(&criteria).await?;
    log_usage(&budget);

    if args.json {
        return print_json(&summary);
    }
    println!(
        "Screened {} documents ({} indeterminate), {} failed",
        summary.screened, summary.indeterminate, summary.failed
    );
    Ok(())
}
