//! Raw dataset ingestion.
//!
//! Reads a delimited file into an in-memory Polars table and reports the
//! fatal conditions (missing file, empty file) that abort a run before any
//! cleaning happens.

pub mod error;
pub mod reader;

pub use error::{IngestError, Result};
pub use reader::{INFER_SCHEMA_ROWS, NA_VALUES, read_csv_table};
