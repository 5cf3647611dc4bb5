//! Run configuration.
//!
//! Every field has a default, so an absent or partial `whdh.toml` is valid.
//! CLI flags override the directory settings after loading.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::xmart::DEFAULT_BASE_URL;
use crate::domain::{Thresholds, YearWindow};
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `{prefix}*.csv` partitions.
    pub data_dir: PathBuf,
    /// Directory receiving the published JSON series.
    pub output_dir: PathBuf,
    pub years: AnchorYears,
    pub windows: Windows,
    pub thresholds: ThresholdConfig,
    pub precision: Precision,
    /// Extra raw label -> canonical label substitutions.
    pub labels: BTreeMap<String, String>,
    pub extract: ExtractConfig,
    pub financing: FinancingCodes,
}

/// Fixed reference years.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AnchorYears {
    /// First year of the LCU index (value 100).
    pub base: i32,
    /// Price and exchange-rate year of constant-USD values.
    pub rebase: i32,
    /// Coverage year for zero-dose counts.
    pub zerodose: i32,
    /// Population rows before this year are ignored.
    pub population_min: i32,
    /// First WEO year column kept by the converter.
    pub weo_first_year: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Windows {
    pub vaccine_spend: YearWindow,
    pub fiscal: YearWindow,
    pub financing: YearWindow,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub fiscal: Thresholds,
    pub financing_mix: Thresholds,
}

/// Decimal places per stage.
///
/// Capped at [`Precision::MAX`]; an `f64` carries no more significant digits.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Precision {
    pub output: u32,
    pub table: u32,
    pub derived: u32,
}

impl Precision {
    pub const MAX: u32 = 15;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub tables: Vec<String>,
    pub first_year: i32,
    pub last_year: i32,
    pub page_size: usize,
    pub base_url: String,
}

/// Indicator codes of the `REF_FINANCING` source.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FinancingCodes {
    pub gdp: String,
    pub che: String,
    pub phc: String,
    pub gghe_d: String,
    pub ext: String,
    pub population_type: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("whdh_gold"),
            years: AnchorYears::default(),
            windows: Windows::default(),
            thresholds: ThresholdConfig::default(),
            precision: Precision::default(),
            labels: BTreeMap::new(),
            extract: ExtractConfig::default(),
            financing: FinancingCodes::default(),
        }
    }
}

impl Default for AnchorYears {
    fn default() -> Self {
        Self {
            base: 2023,
            rebase: 2024,
            zerodose: 2022,
            population_min: 2011,
            weo_first_year: 2011,
        }
    }
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            vaccine_spend: YearWindow::new(2018, 2023),
            fiscal: YearWindow::new(2023, 2029),
            financing: YearWindow::new(2018, 2021),
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            fiscal: Thresholds { center: 100.0, width: 5.0 },
            financing_mix: Thresholds { center: 0.5, width: 0.1 },
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            output: 2,
            table: 3,
            derived: 4,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            tables: [
                "REF_POPULATIONS",
                "V_AD_COV_BOP_LONG",
                "REF_FINANCING",
                "AD_COVERAGES",
                "MT_AD_IA2030_FINANCING",
            ]
            .map(String::from)
            .to_vec(),
            first_year: 2018,
            last_year: 2025,
            page_size: 10_000,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for FinancingCodes {
    fn default() -> Self {
        Self {
            gdp: "GDP".to_string(),
            che: "CHE".to_string(),
            phc: "PHC".to_string(),
            gghe_d: "GGHE_D".to_string(),
            ext: "EXT".to_string(),
            population_type: "TOTAL".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load from `path`, or return defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config = Self::from_toml(&text)?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let windows = [
            ("vaccine_spend", self.windows.vaccine_spend),
            ("fiscal", self.windows.fiscal),
            ("financing", self.windows.financing),
        ];
        for (name, w) in windows {
            if w.start > w.end {
                return Err(PipelineError::Config(format!(
                    "window `{name}` starts after it ends ({} > {})",
                    w.start, w.end
                )));
            }
        }
        for (name, t) in [("fiscal", self.thresholds.fiscal), ("financing_mix", self.thresholds.financing_mix)] {
            if t.width.is_nan() || t.width <= 0.0 || !t.center.is_finite() {
                return Err(PipelineError::Config(format!("thresholds `{name}` need a finite center and positive width")));
            }
        }
        let precision = [
            ("output", self.precision.output),
            ("table", self.precision.table),
            ("derived", self.precision.derived),
        ];
        for (name, places) in precision {
            if places > Precision::MAX {
                return Err(PipelineError::Config(format!(
                    "precision.{name} = {places} exceeds {} decimal places",
                    Precision::MAX
                )));
            }
        }
        if self.extract.page_size == 0 {
            return Err(PipelineError::Config("extract.page_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn extract_years(&self) -> Vec<i32> {
        (self.extract.first_year..=self.extract.last_year).collect()
    }
}
