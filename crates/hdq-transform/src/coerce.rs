//! Numeric coercion.

use polars::prelude::{DataFrame, DataType, NamedFrom, Series};
use tracing::{debug, info};

use hdq_common::{ColumnSet, column_f64_values, column_missing_mask};

use crate::error::Result;

/// Force each listed column that exists on the frame to `Float64`.
///
/// Values that do not parse as a decimal number become null. Listed columns
/// missing from the frame are skipped. Coercing an already numeric column is a
/// no-op.
///
/// # Errors
///
/// Returns a Polars error if a rebuilt column cannot replace the original.
pub fn coerce_numeric(df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
    let mut table = df.clone();
    let present = ColumnSet::from_frame(df);
    for name in present.present(columns) {
        let (Some(values), Some(was_missing)) =
            (column_f64_values(df, name), column_missing_mask(df, name))
        else {
            continue;
        };
        let introduced = values
            .iter()
            .zip(&was_missing)
            .filter(|(value, missing)| value.is_none() && !**missing)
            .count();
        let already_numeric = df
            .column(name)
            .map(|column| column.dtype() == &DataType::Float64)
            .unwrap_or(false);
        if already_numeric && introduced == 0 {
            debug!(column = name, "already numeric");
            continue;
        }
        table.with_column(Series::new(name.into(), values))?;
        info!(column = name, nulls_introduced = introduced, "numeric cast");
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_columns_are_skipped() {
        let df = DataFrame::new(vec![
            Series::new("gender".into(), vec![Some("male")]).into(),
        ])
        .unwrap();
        let out = coerce_numeric(&df, &["height".to_string()]).unwrap();
        assert!(out.equals_missing(&df));
    }
}
