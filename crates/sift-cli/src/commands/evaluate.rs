use anyhow::{bail, Result};

use sift_core::Evaluator;
use sift_runtime::RuntimeConfig;

use super::{load_criteria, load_gold, open_store, print_json};
use crate::cli::EvaluateArgs;

pub fn run(config: RuntimeConfig, args: EvaluateArgs) -> Result<()> {
    if args.results.is_none() && config.results.path.is_none() {
        bail!("no verdict file: pass --results or set results.path");
    }
    let criteria = load_criteria(&args.criteria)?;
    let gold = load_gold(&args.gold)?;
    let records = open_store(&config, args.results.as_ref())?.records()?;

    let report = Evaluator::new(config.evaluation).evaluate(&criteria, &records, &gold)?;

    if args.json {
        return print_json(&report);
    }

    let m = &report.metrics;
    println!("Records: {} ({} used for training)", records.len(), report.training_rows);
    println!(
        "Confusion: tp={} tn={} fp={} fn={}",
        report.confusion.true_positives,
        report.confusion.true_negatives,
        report.confusion.false_positives,
        report.confusion.false_negatives
    );
    println!("Precision:        {:.3}", m.precision);
    println!("Recall:           {:.3}", m.recall);
    println!("F1:               {:.3}", m.f1);
    println!("MCC (smoothed):   {:.3}", m.mcc);
    println!("Cohen's kappa:    {:.3}", m.cohen_kappa);
    println!("PABAK:            {:.3}", m.pabak);
    println!("Fowlkes-Mallows:  {:.3}", m.fowlkes_mallows);
    println!("Specificity:      {:.3}", m.specificity);
    println!("Accuracy:         {:.3}", m.accuracy);
    println!("Completion rate:  {:.3}", m.completion_rate);
    println!("Feature importances:");
    for importance in &report.importances {
        println!("  {:<24} {:.4}", importance.name, importance.importance);
    }
    Ok(())
}
