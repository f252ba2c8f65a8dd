use std::collections::BTreeMap;
use std::path::PathBuf;

/// Table shape after one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageShape {
    pub stage: &'static str,
    pub rows: usize,
    pub columns: usize,
}

/// Paths written by the output stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPaths {
    pub accepted: Option<PathBuf>,
    pub rejected: Option<PathBuf>,
}

#[derive(Debug)]
pub struct RunResult {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub shapes: Vec<StageShape>,
    pub accepted_rows: usize,
    pub rejected_rows: usize,
    pub reason_counts: BTreeMap<String, usize>,
    /// Published columns that had to be filled with nulls.
    pub missing_columns: Vec<String>,
    pub natural_key: Option<String>,
    pub outputs: OutputPaths,
    pub audit_path: Option<PathBuf>,
    pub dry_run: bool,
}
