//! Shared utilities for the health data-quality crates.
//!
//! This crate provides common utilities used across the workspace,
//! including Polars `AnyValue` conversions and column capability lookups.

pub mod columns;
pub mod values;

// Re-export commonly used functions at crate root for convenience
pub use columns::{ColumnSet, column_f64_values, column_missing_mask};
pub use values::{any_to_f64, any_to_string, format_numeric, is_missing, parse_f64};
