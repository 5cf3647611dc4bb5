//! Shared domain types.
//!
//! These are intentionally small and serializable so they can be read from
//! the TOML configuration and written into JSON outputs unchanged.

use serde::{Deserialize, Serialize};

/// Canonical column names produced by the dimension normalizer.
pub mod columns {
    pub const COUNTRY_CODE: &str = "country_code";
    pub const COUNTRY: &str = "country";
    pub const REGION: &str = "WHO_region";
    pub const INCOME_GROUP: &str = "GAVI";
    pub const YEAR: &str = "year";
    pub const INDICATOR: &str = "indicator_code";
    pub const VALUE: &str = "value";
}

/// WHO region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Afr,
    Amr,
    Emr,
    Eur,
    Sear,
    Wpr,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::Afr,
        Region::Amr,
        Region::Emr,
        Region::Eur,
        Region::Sear,
        Region::Wpr,
    ];

    /// Labels used by the source systems (regional-office and short forms).
    pub fn source_labels(self) -> [&'static str; 2] {
        match self {
            Region::Afr => ["AFRO", "AFR"],
            Region::Amr => ["AMRO", "AMR"],
            Region::Emr => ["EMRO", "EMR"],
            Region::Eur => ["EURO", "EUR"],
            Region::Sear => ["SEARO", "SEAR"],
            Region::Wpr => ["WPRO", "WPR"],
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Region::Afr => "African Region",
            Region::Amr => "Americas Region",
            Region::Emr => "Eastern Mediterranean Region",
            Region::Eur => "European Region",
            Region::Sear => "South-East Asian Region",
            Region::Wpr => "Western Pacific Region",
        }
    }
}

/// Gavi income status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncomeGroup {
    Low,
    MiddleEligible,
    MiddleIneligible,
    High,
}

impl IncomeGroup {
    pub const ALL: [IncomeGroup; 4] = [
        IncomeGroup::Low,
        IncomeGroup::MiddleEligible,
        IncomeGroup::MiddleIneligible,
        IncomeGroup::High,
    ];

    pub fn source_label(self) -> &'static str {
        match self {
            IncomeGroup::Low => "Gavi low income",
            IncomeGroup::MiddleEligible => "Gavi low-middle income",
            IncomeGroup::MiddleIneligible => "non-Gavi middle income",
            IncomeGroup::High => "High income",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            IncomeGroup::Low => "Low Income",
            IncomeGroup::MiddleEligible => "MIC (GAVI eligible)",
            IncomeGroup::MiddleIneligible => "MIC (GAVI ineligible)",
            IncomeGroup::High => "High Income",
        }
    }
}

/// Output aggregation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Region,
    Country,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Region => "region",
            Granularity::Country => "country",
        }
    }

    /// Column the aggregator groups by at this granularity.
    pub fn group_column(self) -> &'static str {
        match self {
            Granularity::Region => columns::REGION,
            Granularity::Country => columns::COUNTRY,
        }
    }
}

/// Inclusive range of years emitted in an output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearWindow {
    pub start: i32,
    pub end: i32,
}

impl YearWindow {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn years(self) -> Vec<i32> {
        (self.start..=self.end).collect()
    }
}

/// Symmetric bucket layout around `center`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub center: f64,
    pub width: f64,
}
