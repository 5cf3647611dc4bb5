//! Nested `group -> year -> value` output maps.

use std::collections::BTreeMap;

use crate::transform::aggregate::GroupedSeries;
use crate::transform::derive::round_to;

/// One group's year map. Missing years hold NaN, which serializes as `null`.
pub type YearMap = BTreeMap<i32, f64>;

pub type NestedSeries = BTreeMap<String, YearMap>;

/// How aggregated values are presented.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    pub years: Vec<i32>,
    pub precision: u32,
    /// Multiply by 100 (ratio to percentage).
    pub percent: bool,
}

/// A fresh year map with every requested year set to NaN.
///
/// Called once per group so no two groups share storage.
fn empty_year_map(years: &[i32]) -> YearMap {
    years.iter().map(|&y| (y, f64::NAN)).collect()
}

/// Round (and optionally rescale) a value; NaN stays NaN.
pub fn nan_or_round(value: f64, percent: bool, precision: u32) -> f64 {
    if value.is_nan() {
        return f64::NAN;
    }
    round_to(if percent { value * 100.0 } else { value }, precision)
}

/// Restrict `series` to `options.years`, filling absent years with NaN.
pub fn build_nested(series: &GroupedSeries, options: &OutputOptions) -> NestedSeries {
    let mut out = NestedSeries::new();
    for (group, years) in series {
        let mut map = empty_year_map(&options.years);
        for (year, &value) in years {
            if let Some(slot) = map.get_mut(year) {
                *slot = nan_or_round(value, options.percent, options.precision);
            }
        }
        out.insert(group.clone(), map);
    }
    out
}
