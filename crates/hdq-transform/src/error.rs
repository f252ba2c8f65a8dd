//! Error types for table transformations.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Structural failures raised while transforming a table.
///
/// Data-content problems are never errors; they become nulls or dropped columns.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Two raw column names normalize to the same name.
    #[error("columns collide after name normalization: `{name}`")]
    DuplicateColumn { name: String },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, TransformError>;
