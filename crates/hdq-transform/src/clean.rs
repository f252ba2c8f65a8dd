//! Schema-agnostic structural cleanup.
//!
//! [`clean`] knows nothing about column semantics beyond the placeholder names
//! and the null threshold held by the [`RuleSet`]. It removes duplicate rows and
//! unusable columns and normalizes names and string values. It never rejects
//! rows for their content.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use polars::prelude::{
    AnyValue, BooleanChunked, Column, DataFrame, DataType, NamedFrom, NewChunkedArray, Series,
};
use regex::Regex;
use tracing::{debug, info};

use hdq_common::{any_to_string, is_missing};
use hdq_model::RuleSet;

use crate::error::{Result, TransformError};

static BLANK_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*$").expect("valid blank-value regex"));

/// Clean a raw table.
///
/// The first pass runs, in order: name normalization, string normalization,
/// duplicate-row removal, empty-column removal, placeholder-column removal,
/// blank-to-null replacement and null-threshold column removal. The last five
/// steps then repeat until the table stops changing, so cleaning an already
/// cleaned table is a no-op.
///
/// # Errors
///
/// Returns [`TransformError::DuplicateColumn`] when two raw names collide after
/// normalization, or a Polars error if the frame cannot be rebuilt.
pub fn clean(df: &DataFrame, rules: &RuleSet) -> Result<DataFrame> {
    let (rows_before, columns_before) = df.shape();

    let table = normalize_column_names(df)?;
    let table = normalize_string_values(&table)?;

    let deduped = drop_duplicate_rows(&table)?;
    info!(
        rows_before = table.height(),
        rows_after = deduped.height(),
        "removed duplicate rows"
    );

    let table = drop_empty_columns(&deduped)?;
    let table = drop_placeholder_columns(&table, &rules.placeholder_columns)?;
    let table = blank_strings_to_null(&table)?;
    let mut table = drop_sparse_columns(&table, rules.null_threshold)?;

    let mut passes = 1;
    loop {
        let shape = table.shape();
        table = settle_pass(&table, rules)?;
        if table.shape() == shape {
            break;
        }
        passes += 1;
        debug!(pass = passes, rows = table.height(), columns = table.width(), "settling");
    }

    info!(
        rows_before,
        rows_after = table.height(),
        columns_before,
        columns_after = table.width(),
        passes,
        "cleaned table"
    );
    Ok(table)
}

fn settle_pass(df: &DataFrame, rules: &RuleSet) -> Result<DataFrame> {
    let table = drop_duplicate_rows(df)?;
    let table = drop_empty_columns(&table)?;
    let table = drop_placeholder_columns(&table, &rules.placeholder_columns)?;
    let table = blank_strings_to_null(&table)?;
    drop_sparse_columns(&table, rules.null_threshold)
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Trim and lowercase every column name.
///
/// # Errors
///
/// Fails with [`TransformError::DuplicateColumn`] if two names collide.
pub fn normalize_column_names(df: &DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Ok(df.clone());
    }
    let mut seen = BTreeSet::new();
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = normalize_name(column.name().as_str());
        if !seen.insert(name.clone()) {
            return Err(TransformError::DuplicateColumn { name });
        }
        columns.push(column.clone().with_name(name.into()));
    }
    Ok(DataFrame::new(columns)?)
}

/// Trim and lowercase every value of every string column.
pub fn normalize_string_values(df: &DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Ok(df.clone());
    }
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        if column.dtype() == &DataType::String {
            let values: Vec<Option<String>> = column
                .str()?
                .into_iter()
                .map(|value| value.map(|s| s.trim().to_lowercase()))
                .collect();
            columns.push(Series::new(column.name().clone(), values).into());
        } else {
            columns.push(column.clone());
        }
    }
    Ok(DataFrame::new(columns)?)
}

fn row_key(df: &DataFrame, idx: usize) -> Vec<Option<String>> {
    df.get_columns()
        .iter()
        .map(|column| {
            let value = column.get(idx).unwrap_or(AnyValue::Null);
            if is_missing(&value) {
                None
            } else {
                Some(any_to_string(value))
            }
        })
        .collect()
}

/// Remove rows equal in every column to an earlier row, keeping the first.
///
/// Nulls compare equal to each other and differ from every value. A table with
/// no columns keeps its rows.
pub fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    if df.height() < 2 || df.width() == 0 {
        return Ok(df.clone());
    }
    let mut seen = BTreeSet::new();
    let keep: Vec<bool> = (0..df.height())
        .map(|idx| seen.insert(row_key(df, idx)))
        .collect();
    if keep.iter().all(|k| *k) {
        return Ok(df.clone());
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

fn missing_count(column: &Column) -> usize {
    (0..column.len())
        .filter(|idx| is_missing(&column.get(*idx).unwrap_or(AnyValue::Null)))
        .count()
}

fn retain_columns<F>(df: &DataFrame, keep: F) -> Result<(DataFrame, Vec<String>)>
where
    F: Fn(&Column) -> bool,
{
    let mut kept = Vec::with_capacity(df.width());
    let mut dropped = Vec::new();
    for column in df.get_columns() {
        if keep(column) {
            kept.push(column.clone());
        } else {
            dropped.push(column.name().to_string());
        }
    }
    if dropped.is_empty() {
        return Ok((df.clone(), dropped));
    }
    if kept.is_empty() {
        // A frame built from no columns has no rows.
        return Ok((DataFrame::empty_with_height(df.height()), dropped));
    }
    Ok((DataFrame::new(kept)?, dropped))
}

/// Remove columns in which every value is missing. Zero-row tables are left alone.
pub fn drop_empty_columns(df: &DataFrame) -> Result<DataFrame> {
    let height = df.height();
    if height == 0 {
        return Ok(df.clone());
    }
    let (table, dropped) = retain_columns(df, |column| missing_count(column) < height)?;
    if !dropped.is_empty() {
        info!(columns = ?dropped, "dropped empty columns");
    }
    Ok(table)
}

/// Remove columns whose normalized name is a configured placeholder.
pub fn drop_placeholder_columns(df: &DataFrame, placeholders: &[String]) -> Result<DataFrame> {
    let placeholders: BTreeSet<String> = placeholders.iter().map(|p| normalize_name(p)).collect();
    let (table, dropped) =
        retain_columns(df, |column| !placeholders.contains(column.name().as_str()))?;
    if !dropped.is_empty() {
        debug!(columns = ?dropped, "dropped placeholder columns");
    }
    Ok(table)
}

/// Replace empty and whitespace-only strings with nulls.
pub fn blank_strings_to_null(df: &DataFrame) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    let mut replaced = 0usize;
    for column in df.get_columns() {
        if column.dtype() != &DataType::String {
            columns.push(column.clone());
            continue;
        }
        let chunked = column.str()?;
        let blanks = chunked
            .into_iter()
            .flatten()
            .filter(|s| BLANK_VALUE.is_match(s))
            .count();
        if blanks == 0 {
            columns.push(column.clone());
            continue;
        }
        replaced += blanks;
        let values: Vec<Option<&str>> = chunked
            .into_iter()
            .map(|value| value.filter(|s| !BLANK_VALUE.is_match(s)))
            .collect();
        debug!(column = %column.name(), blanks, "blank values set to null");
        columns.push(Series::new(column.name().clone(), values).into());
    }
    if replaced == 0 {
        return Ok(df.clone());
    }
    Ok(DataFrame::new(columns)?)
}

/// Remove columns whose missing percentage is above `threshold`.
///
/// All percentages come from the same snapshot. Zero-row tables are left alone.
pub fn drop_sparse_columns(df: &DataFrame, threshold: f64) -> Result<DataFrame> {
    let height = df.height();
    if height == 0 {
        return Ok(df.clone());
    }
    let (table, dropped) = retain_columns(df, |column| {
        let percent = missing_count(column) as f64 * 100.0 / height as f64;
        percent <= threshold
    })?;
    if !dropped.is_empty() {
        info!(threshold, columns = ?dropped, "dropped columns above null threshold");
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_pattern_matches_whitespace_only() {
        assert!(BLANK_VALUE.is_match(""));
        assert!(BLANK_VALUE.is_match("  \t"));
        assert!(!BLANK_VALUE.is_match(" a "));
    }

    #[test]
    fn normalize_name_trims_and_lowercases() {
        assert_eq!(normalize_name("  Patient_Barcode "), "patient_barcode");
        assert_eq!(normalize_name("Unnamed: 0"), "unnamed: 0");
    }

    #[test]
    fn row_key_keeps_null_distinct_from_empty() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), vec![None, Some("")]).into(),
        ])
        .unwrap();
        assert_ne!(row_key(&df, 0), row_key(&df, 1));
    }
}
