//! Row validation for the health data-quality pipeline.
//!
//! [`validate`] coerces numeric columns, derives features, checks required
//! fields and domain ranges, and splits the table into accepted and rejected
//! rows. Rejected rows carry a reason string built by [`RejectReason`].

pub mod audit;
pub mod error;
pub mod reasons;
pub mod validator;

pub use audit::write_rejects_json;
pub use error::{Result, ValidateError};
pub use reasons::RejectReason;
pub use validator::{Partition, RowChecks, build_row_checks, validate, validate_with_audit};
