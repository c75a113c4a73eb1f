use std::path::Path;

use anyhow::{bail, Result};

use sift_runtime::RuntimeConfig;

use super::load_criteria;
use crate::cli::ValidateArgs;

pub fn run(config_path: Option<&Path>, config: &RuntimeConfig, args: ValidateArgs) -> Result<()> {
    if let Some(path) = config_path {
        println!("ok  {} (provider {}, model {})", path.display(), config.provider.kind, config.provider.model);
    }

    let mut failures = 0;
    for path in &args.criteria {
        match load_criteria(path) {
            Ok(criteria) => println!("ok  {} ({} criteria)", path.display(), criteria.len()),
            Err(err) => {
                failures += 1;
                println!("err {}: {:#}", path.display(), err);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} criteria files are invalid", failures, args.criteria.len());
    }
    Ok(())
}
