//! Table transformations for the health data-quality pipeline.
//!
//! - **clean**: schema-agnostic structural cleanup of a raw table
//! - **coerce**: forcing configured columns to numbers
//! - **features**: BMI and alcohol-risk derivation

pub mod clean;
pub mod coerce;
pub mod error;
pub mod features;

pub use clean::clean;
pub use coerce::coerce_numeric;
pub use error::{Result, TransformError};
pub use features::{
    add_alcohol_features, add_bmi, add_bmi_category, alcohol_risk, bmi_category, derive_features,
};
