//! Required-field and domain-rule checks, and the accepted/rejected split.

use std::collections::BTreeMap;
use std::path::Path;

use polars::prelude::{
    BooleanChunked, DataFrame, DataType, NamedFrom, NewChunkedArray, Series,
};
use tracing::{info, warn};

use hdq_common::{ColumnSet, column_f64_values, column_missing_mask};
use hdq_model::{RuleSet, ValueRange};
use hdq_transform::{coerce_numeric, derive_features};

use crate::audit::write_rejects_json;
use crate::error::Result;
use crate::reasons::RejectReason;

/// The two outputs of validation.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Rows that passed every check, with derived columns.
    pub accepted: DataFrame,
    /// Rows that failed at least one check, with the reason column appended.
    pub rejected: DataFrame,
    pub reason_column: String,
}

impl Partition {
    pub fn accepted_count(&self) -> usize {
        self.accepted.height()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.height()
    }

    pub fn total(&self) -> usize {
        self.accepted_count() + self.rejected_count()
    }

    /// Number of rejected rows per distinct reason string.
    pub fn reason_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        let Ok(column) = self.rejected.column(&self.reason_column) else {
            return counts;
        };
        let Ok(reasons) = column.str() else {
            return counts;
        };
        for reason in reasons.into_iter().flatten() {
            *counts.entry(reason.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Per-row check results, computed column-wise.
#[derive(Debug, Clone, Default)]
pub struct RowChecks {
    /// Required columns present on the table, in configured order.
    pub existing_required: Vec<String>,
    /// Missing flags for each entry of `existing_required`.
    pub missing_by_column: Vec<Vec<bool>>,
    pub missing: Vec<bool>,
    pub height_invalid: Vec<bool>,
    pub weight_invalid: Vec<bool>,
}

impl RowChecks {
    pub fn invalid(&self) -> Vec<bool> {
        (0..self.missing.len()).map(|idx| self.is_invalid(idx)).collect()
    }

    pub fn is_invalid(&self, idx: usize) -> bool {
        self.missing[idx] || self.height_invalid[idx] || self.weight_invalid[idx]
    }

    pub fn any_invalid(&self) -> bool {
        (0..self.missing.len()).any(|idx| self.is_invalid(idx))
    }

    /// Null required columns for one row, in configured order.
    pub fn missing_fields(&self, idx: usize) -> Vec<&str> {
        self.existing_required
            .iter()
            .zip(&self.missing_by_column)
            .filter(|(_, mask)| mask[idx])
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn reason(&self, idx: usize, rules: &RuleSet) -> RejectReason {
        RejectReason::build(
            &self.missing_fields(idx),
            self.height_invalid[idx],
            self.weight_invalid[idx],
            &rules.reasons,
        )
    }
}

fn out_of_range(
    df: &DataFrame,
    column: &str,
    range: ValueRange,
    candidate: &[bool],
) -> Vec<bool> {
    match column_f64_values(df, column) {
        Some(values) => values
            .iter()
            .zip(candidate)
            .map(|(value, candidate)| {
                *candidate && value.is_some_and(|v| v <= range.min || v > range.max)
            })
            .collect(),
        None => vec![false; df.height()],
    }
}

/// Compute the missing and domain masks for every row.
///
/// With no required column present on the table every mask is all-false.
/// Domain rules are only evaluated on rows that have every required field.
pub fn build_row_checks(df: &DataFrame, rules: &RuleSet) -> RowChecks {
    let height = df.height();
    let columns = ColumnSet::from_frame(df);
    let existing_required: Vec<String> = columns
        .present(&rules.required_columns)
        .into_iter()
        .map(str::to_string)
        .collect();

    if existing_required.is_empty() {
        return RowChecks {
            existing_required,
            missing_by_column: Vec::new(),
            missing: vec![false; height],
            height_invalid: vec![false; height],
            weight_invalid: vec![false; height],
        };
    }

    let missing_by_column: Vec<Vec<bool>> = existing_required
        .iter()
        .map(|name| column_missing_mask(df, name).unwrap_or_else(|| vec![false; height]))
        .collect();
    let missing: Vec<bool> = (0..height)
        .map(|idx| missing_by_column.iter().any(|mask| mask[idx]))
        .collect();
    let candidate: Vec<bool> = missing.iter().map(|m| !m).collect();

    let height_invalid = out_of_range(df, &rules.features.height, rules.height, &candidate);
    let weight_invalid = out_of_range(df, &rules.features.weight, rules.weight, &candidate);

    RowChecks {
        existing_required,
        missing_by_column,
        missing,
        height_invalid,
        weight_invalid,
    }
}

fn empty_rejected(df: &DataFrame, rules: &RuleSet) -> Result<DataFrame> {
    let mut rejected = df.slice(0, 0);
    rejected.with_column(Series::new_empty(
        rules.reason_column.as_str().into(),
        &DataType::String,
    ))?;
    Ok(rejected)
}

/// Coerce, enrich, check and partition a cleaned table.
///
/// Both outputs keep the input row order. The rejected table has the enriched
/// columns plus the reason column; when no row fails it is empty with that
/// same schema.
///
/// # Errors
///
/// Returns an error only for structural Polars failures.
pub fn validate(df: &DataFrame, rules: &RuleSet) -> Result<Partition> {
    let typed = coerce_numeric(df, &rules.numeric_columns)?;
    let enriched = derive_features(&typed, rules)?;
    let checks = build_row_checks(&enriched, rules);

    if checks.existing_required.is_empty() {
        warn!("no required columns present, accepting every row");
    }

    if !checks.any_invalid() {
        info!(accepted = enriched.height(), rejected = 0, "validated rows");
        return Ok(Partition {
            rejected: empty_rejected(&enriched, rules)?,
            accepted: enriched,
            reason_column: rules.reason_column.clone(),
        });
    }

    let invalid = checks.invalid();
    let reasons: Vec<String> = invalid
        .iter()
        .enumerate()
        .filter(|(_, invalid)| **invalid)
        .map(|(idx, _)| checks.reason(idx, rules).render())
        .collect();
    let valid: Vec<bool> = invalid.iter().map(|i| !i).collect();

    let mut rejected = enriched.filter(&BooleanChunked::from_slice("invalid".into(), &invalid))?;
    rejected.with_column(Series::new(rules.reason_column.as_str().into(), reasons))?;
    let accepted = enriched.filter(&BooleanChunked::from_slice("valid".into(), &valid))?;

    info!(
        accepted = accepted.height(),
        rejected = rejected.height(),
        "validated rows"
    );
    Ok(Partition {
        accepted,
        rejected,
        reason_column: rules.reason_column.clone(),
    })
}

/// Run [`validate`] and write rejected rows to `audit_path` when there are any.
///
/// The audit write is best effort: a failure is logged and the partition is
/// returned unchanged.
///
/// # Errors
///
/// Returns an error only when [`validate`] fails.
pub fn validate_with_audit(
    df: &DataFrame,
    rules: &RuleSet,
    audit_path: Option<&Path>,
) -> Result<Partition> {
    let partition = validate(df, rules)?;
    if let Some(path) = audit_path
        && partition.rejected_count() > 0
    {
        match write_rejects_json(&partition.rejected, path) {
            Ok(()) => info!(
                path = %path.display(),
                rows = partition.rejected_count(),
                "wrote rejected rows audit"
            ),
            Err(error) => warn!(
                path = %path.display(),
                error = %error,
                "failed to write rejected rows audit"
            ),
        }
    }
    Ok(partition)
}
