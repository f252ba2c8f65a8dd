//! Pipeline run with explicit stages.
//!
//! The pipeline follows these stages in order:
//! 1. **Ingest**: Read the source CSV file
//! 2. **Clean**: Structural cleanup of the raw table
//! 3. **Validate**: Coerce, derive features, partition rows, write the audit file
//! 4. **Align**: Rename columns and project onto the published schemas
//! 5. **Output**: Write accepted and rejected CSV files
//!
//! Each stage runs in its own span and logs its duration.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::{AnyValue, Column, DataFrame, DataType, Series};
use tracing::{info, info_span, trace, warn};

use hdq_common::any_to_string;
use hdq_ingest::read_csv_table;
use hdq_model::RuleSet;
use hdq_transform::clean;
use hdq_validate::{Partition, validate_with_audit};

use crate::logging::{log_data_enabled, redact_value};
use crate::types::{OutputPaths, RunResult, StageShape};

/// File name of the accepted-row output.
pub const ACCEPTED_FILE: &str = "accepted.csv";
/// File name of the rejected-row output.
pub const REJECTED_FILE: &str = "rejected.csv";

/// Inputs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Rejected-row audit file; `None` disables it.
    pub audit_path: Option<PathBuf>,
    /// Validate and report without writing any file.
    pub dry_run: bool,
}

fn shape(stage: &'static str, df: &DataFrame) -> StageShape {
    StageShape {
        stage,
        rows: df.height(),
        columns: df.width(),
    }
}

/// Run every stage against the input file.
///
/// # Errors
///
/// Returns an error if the input cannot be read, if cleaning or validation
/// hits a structural failure, or if an output file cannot be written.
pub fn run_pipeline(options: &PipelineOptions, rules: &RuleSet) -> Result<RunResult> {
    let run_span = info_span!("run", input = %options.input.display());
    let _run_guard = run_span.enter();
    let run_start = Instant::now();
    let mut shapes = Vec::new();

    let raw = info_span!("ingest").in_scope(|| -> Result<DataFrame> {
        let start = Instant::now();
        let df = read_csv_table(&options.input)
            .with_context(|| format!("read {}", options.input.display()))?;
        info!(
            rows = df.height(),
            columns = df.width(),
            duration_ms = start.elapsed().as_millis(),
            "ingest complete"
        );
        Ok(df)
    })?;
    shapes.push(shape("raw", &raw));

    let cleaned = info_span!("clean").in_scope(|| -> Result<DataFrame> {
        let start = Instant::now();
        let df = clean(&raw, rules).context("clean source table")?;
        info!(
            rows = df.height(),
            columns = df.width(),
            duration_ms = start.elapsed().as_millis(),
            "clean complete"
        );
        Ok(df)
    })?;
    shapes.push(shape("cleaned", &cleaned));

    let audit_path = if options.dry_run {
        None
    } else {
        options.audit_path.as_deref()
    };
    let partition = info_span!("validate").in_scope(|| -> Result<Partition> {
        let start = Instant::now();
        let partition =
            validate_with_audit(&cleaned, rules, audit_path).context("validate rows")?;
        info!(
            accepted = partition.accepted_count(),
            rejected = partition.rejected_count(),
            duration_ms = start.elapsed().as_millis(),
            "validate complete"
        );
        Ok(partition)
    })?;
    shapes.push(shape("accepted", &partition.accepted));
    shapes.push(shape("rejected", &partition.rejected));
    trace_rejected_rows(&partition, rules);

    let (accepted, rejected, missing_columns) =
        info_span!("align").in_scope(|| -> Result<(DataFrame, DataFrame, Vec<String>)> {
            let start = Instant::now();
            let accepted = align_output(&partition.accepted, &rules.renames, &rules.output_columns)
                .context("align accepted rows")?;
            let rejected =
                align_output(&partition.rejected, &rules.renames, &rules.reject_columns())
                    .context("align rejected rows")?;
            let mut missing: BTreeSet<String> = accepted.missing.into_iter().collect();
            missing.extend(rejected.missing);
            info!(
                columns = accepted.frame.width(),
                natural_key = rules.natural_key().unwrap_or_default(),
                duration_ms = start.elapsed().as_millis(),
                "align complete"
            );
            Ok((accepted.frame, rejected.frame, missing.into_iter().collect()))
        })?;

    let outputs = if options.dry_run {
        info!("dry run, no files written");
        OutputPaths::default()
    } else {
        info_span!("output").in_scope(|| -> Result<OutputPaths> {
            let start = Instant::now();
            fs::create_dir_all(&options.output_dir).with_context(|| {
                format!("create output dir {}", options.output_dir.display())
            })?;
            let accepted_path = options.output_dir.join(ACCEPTED_FILE);
            let rejected_path = options.output_dir.join(REJECTED_FILE);
            write_csv(&accepted, &accepted_path)?;
            write_csv(&rejected, &rejected_path)?;
            info!(
                output_dir = %options.output_dir.display(),
                duration_ms = start.elapsed().as_millis(),
                "output complete"
            );
            Ok(OutputPaths {
                accepted: Some(accepted_path),
                rejected: Some(rejected_path),
            })
        })?
    };

    info!(
        accepted = accepted.height(),
        rejected = rejected.height(),
        duration_ms = run_start.elapsed().as_millis(),
        "run complete"
    );

    let audit_written = audit_path
        .filter(|path| partition.rejected_count() > 0 && path.exists())
        .map(Path::to_path_buf);

    Ok(RunResult {
        input: options.input.clone(),
        output_dir: options.output_dir.clone(),
        shapes,
        accepted_rows: accepted.height(),
        rejected_rows: rejected.height(),
        reason_counts: partition.reason_counts(),
        missing_columns,
        natural_key: rules.natural_key().map(str::to_string),
        outputs,
        audit_path: audit_written,
        dry_run: options.dry_run,
    })
}

fn trace_rejected_rows(partition: &Partition, rules: &RuleSet) {
    let Some(key) = rules.natural_key() else {
        return;
    };
    let (Ok(keys), Ok(reasons)) = (
        partition.rejected.column(key),
        partition.rejected.column(&partition.reason_column),
    ) else {
        return;
    };
    for idx in 0..partition.rejected_count() {
        let key_value = any_to_string(keys.get(idx).unwrap_or(AnyValue::Null));
        let reason = any_to_string(reasons.get(idx).unwrap_or(AnyValue::Null));
        trace!(
            key = redact_value(&key_value),
            log_data = log_data_enabled(),
            reason = %reason,
            "rejected row"
        );
    }
}

/// A table projected onto a published schema.
#[derive(Debug)]
pub struct AlignedTable {
    pub frame: DataFrame,
    /// Published columns absent from the source, filled with nulls.
    pub missing: Vec<String>,
}

/// Rename columns, then project onto `columns` in order.
///
/// When two source columns map to the same published name the first one wins.
/// A published column with no source becomes an all-null string column. Source
/// columns that are not published are dropped.
///
/// # Errors
///
/// Returns an error if the projected frame cannot be assembled.
pub fn align_output(
    df: &DataFrame,
    renames: &BTreeMap<String, String>,
    columns: &[String],
) -> Result<AlignedTable> {
    let mut sources: BTreeMap<&str, &Column> = BTreeMap::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        let target = renames.get(name).map_or(name, String::as_str);
        sources.entry(target).or_insert(column);
    }

    let mut projected = Vec::with_capacity(columns.len());
    let mut missing = Vec::new();
    for name in columns {
        match sources.get(name.as_str()) {
            Some(column) => projected.push((*column).clone().with_name(name.as_str().into())),
            None => {
                warn!(column = %name, "published column missing, filled with nulls");
                missing.push(name.clone());
                projected.push(
                    Series::full_null(name.as_str().into(), df.height(), &DataType::String).into(),
                );
            }
        }
    }
    Ok(AlignedTable {
        frame: DataFrame::new(projected).context("assemble projected table")?,
        missing,
    })
}

/// Write a table as CSV with a header row.
///
/// Nulls become empty fields and floats are written without trailing zeros.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    let header: Vec<&str> = df
        .get_column_names()
        .iter()
        .map(|name| name.as_str())
        .collect();
    writer
        .write_record(&header)
        .with_context(|| format!("write header to {}", path.display()))?;
    for idx in 0..df.height() {
        let record: Vec<String> = df
            .get_columns()
            .iter()
            .map(|column| any_to_string(column.get(idx).unwrap_or(AnyValue::Null)))
            .collect();
        writer
            .write_record(&record)
            .with_context(|| format!("write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    info!(path = %path.display(), rows = df.height(), "wrote table");
    Ok(())
}
