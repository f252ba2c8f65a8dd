//! Error types for rule set loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or checking a [`RuleSet`](crate::RuleSet).
#[derive(Debug, Error)]
pub enum RuleSetError {
    /// Rules file could not be read.
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rules file is not valid TOML for a rule set.
    #[error("failed to parse rules: {0}")]
    Parse(#[from] toml::de::Error),

    /// Rule set could not be rendered as TOML.
    #[error("failed to render rules: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A field holds a value the pipeline cannot work with.
    #[error("invalid rule `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl RuleSetError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for rule set operations.
pub type Result<T> = std::result::Result<T, RuleSetError>;
