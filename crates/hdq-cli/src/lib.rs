//! CLI library components for the health data-quality pipeline.

pub mod logging;
pub mod pipeline;
pub mod types;
