//! Error types for validation.

use std::path::PathBuf;

use hdq_transform::TransformError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Failures raised by validation.
///
/// Row content never produces an error; bad rows end up in the rejected table.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    /// The audit file or its directory could not be written.
    #[error("failed to write audit file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize audit records: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ValidateError>;
