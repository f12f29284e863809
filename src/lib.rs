//! # Burn Sentiment
#![forbid(unsafe_code)]

/// Pipelines
pub mod pipelines;

/// Datasets
pub mod datasets;

/// Utilities
pub mod utils;
