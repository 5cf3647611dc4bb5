//! The indicator engine.
//!
//! - `normalize`: canonical column names and labels
//! - `join`: key-based joins, dedupe, pivot, country dimensions
//! - `derive`: derived indicator formulas
//! - `classify`: threshold buckets
//! - `aggregate`: NaN-skipping group means
//! - `nested`: year-windowed output maps

pub mod aggregate;
pub mod classify;
pub mod derive;
pub mod join;
pub mod nested;
pub mod normalize;

pub use aggregate::{GroupedSeries, group_mean};
pub use classify::Classifier;
pub use join::{Dimensions, JoinKey, JoinKind};
pub use nested::{NestedSeries, OutputOptions, build_nested};
pub use normalize::{ColumnMap, LabelMap};
