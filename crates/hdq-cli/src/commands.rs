use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use hdq_cli::pipeline::{PipelineOptions, run_pipeline};
use hdq_cli::types::RunResult;
use hdq_model::RuleSet;

use crate::cli::{RulesArgs, RunArgs};

/// Load the rule set from `path`, or the built-in defaults.
fn load_rules(path: Option<&Path>) -> Result<RuleSet> {
    match path {
        Some(path) => {
            let rules = RuleSet::load(path)
                .with_context(|| format!("load rules {}", path.display()))?;
            info!(path = %path.display(), "loaded rule set");
            Ok(rules)
        }
        None => Ok(RuleSet::default()),
    }
}

fn default_output_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .map_or_else(|| PathBuf::from("output"), |parent| parent.join("output"))
}

pub fn run_run(args: &RunArgs) -> Result<RunResult> {
    let rules = load_rules(args.rules.as_deref())?;
    let options = PipelineOptions {
        input: args.input.clone(),
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(&args.input)),
        audit_path: (!args.no_audit).then(|| args.rejects_json.clone()),
        dry_run: args.dry_run,
    };
    run_pipeline(&options, &rules)
}

pub fn run_rules(args: &RulesArgs) -> Result<()> {
    let rules = load_rules(args.rules.as_deref())?;
    let rendered = rules.to_toml_string().context("render rules")?;
    print!("{rendered}");
    Ok(())
}
