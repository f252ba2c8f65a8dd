//! Column capability lookups.
//!
//! Every optional check in the pipeline asks the frame whether a column exists
//! before touching it. Absence means "skip", never an error.

use std::collections::BTreeSet;

use polars::prelude::{AnyValue, DataFrame};

use crate::values::{any_to_f64, is_missing};

/// The set of column names present on a frame.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    names: BTreeSet<String>,
}

impl ColumnSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names.into_iter().map(|n| n.as_ref().to_string()).collect(),
        }
    }

    pub fn from_frame(df: &DataFrame) -> Self {
        Self::new(df.get_column_names().iter().map(|name| name.as_str()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names from `wanted` that exist on the frame, in the order of `wanted`.
    pub fn present<'a>(&self, wanted: &'a [String]) -> Vec<&'a str> {
        wanted
            .iter()
            .map(String::as_str)
            .filter(|name| self.contains(name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Reads a column as optional floats, whatever its stored dtype.
///
/// Returns `None` when the column does not exist.
pub fn column_f64_values(df: &DataFrame, name: &str) -> Option<Vec<Option<f64>>> {
    let column = df.column(name).ok()?;
    let values = (0..column.len())
        .map(|idx| any_to_f64(column.get(idx).unwrap_or(AnyValue::Null)))
        .collect();
    Some(values)
}

/// Per-row missing flags for a column, or `None` when the column does not exist.
pub fn column_missing_mask(df: &DataFrame, name: &str) -> Option<Vec<bool>> {
    let column = df.column(name).ok()?;
    let mask = (0..column.len())
        .map(|idx| is_missing(&column.get(idx).unwrap_or(AnyValue::Null)))
        .collect();
    Some(mask)
}
