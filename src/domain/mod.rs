//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - canonical column names (`columns`)
//! - WHO region and Gavi income-group enums with their source labels
//! - output granularity, year windows, and classification thresholds

pub mod types;

pub use types::*;
