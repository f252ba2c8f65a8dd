//! Rule set model for the health data-quality pipeline.
//!
//! Every threshold, column list and label used by cleaning and validation
//! lives in [`RuleSet`]. Components receive it by reference.

pub mod error;
pub mod rules;

pub use error::{Result, RuleSetError};
pub use rules::{
    AlcoholBucket, AlcoholRules, BmiRules, FeatureColumns, ReasonLabels, RuleSet, ValueRange,
};
