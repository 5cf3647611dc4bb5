//! Named analyses.
//!
//! Each analysis loads its sources, derives its indicators, and returns every
//! output in an [`AnalysisOutput`] without touching the output directory.
//! Writing is a separate step, so a failing analysis leaves no files behind.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::PipelineConfig;
use crate::domain::{Granularity, YearWindow, columns};
use crate::error::{PipelineError, Result};
use crate::io::export::{write_series_json, write_table_csv};
use crate::io::source::load_source;
use crate::table::{Record, Table};
use crate::transform::join::dedupe;
use crate::transform::normalize::{ensure_columns, normalize};
use crate::transform::{ColumnMap, Dimensions, LabelMap, NestedSeries, OutputOptions, build_nested, group_mean};

pub mod financing;
pub mod fiscal;
pub mod vaccine_spend;

/// Source of vaccine expenditure and of country dimensions.
pub const IA2030_SOURCE: &str = "MT_AD_IA2030";
pub const POPULATION_SOURCE: &str = "REF_POPULATION";

/// One published `{indicator}_{granularity}.json` file.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesOutput {
    pub indicator: String,
    pub granularity: Granularity,
    pub series: NestedSeries,
}

/// An intermediate table persisted next to the source partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOutput {
    pub file_name: String,
    pub table: Table,
}

/// Everything one analysis produces.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutput {
    pub series: Vec<SeriesOutput>,
    pub tables: Vec<TableOutput>,
}

impl AnalysisOutput {
    /// Write intermediate tables into `data_dir` and series into `output_dir`.
    pub fn write(&self, data_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for t in &self.tables {
            let path = data_dir.join(&t.file_name);
            write_table_csv(&path, &t.table)?;
            written.push(path);
        }
        for s in &self.series {
            written.push(write_series_json(output_dir, &s.indicator, s.granularity, &s.series)?);
        }
        info!(files = written.len(), "wrote analysis outputs");
        Ok(written)
    }

    /// Distinct groups across all series.
    pub fn group_count(&self) -> usize {
        self.series.iter().map(|s| s.series.len()).sum()
    }
}

/// Shared, read-only state of one run.
pub struct Context<'a> {
    pub config: &'a PipelineConfig,
    pub labels: LabelMap,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            labels: LabelMap::who_defaults().with_overrides(&config.labels),
        }
    }

    /// Load `prefix`, keep raw rows accepted by `keep`, then normalize.
    ///
    /// `filter_columns` are raw columns `keep` inspects; they need not survive
    /// the rename.
    pub fn load(
        &self,
        prefix: &str,
        column_map: &ColumnMap,
        filter_columns: &[&str],
        keep: impl FnMut(&Record) -> bool,
    ) -> Result<Table> {
        let raw = load_source(&self.config.data_dir, prefix)?;
        ensure_columns(&raw, prefix, column_map)?;
        for &column in filter_columns {
            if !raw.has_column(column) {
                return Err(PipelineError::MissingColumn {
                    source_name: prefix.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(normalize(&raw.filter(keep), column_map, &self.labels))
    }

    /// Country name, region and income group per code, from the IA2030 source.
    pub fn dimensions(&self) -> Result<Dimensions> {
        let table = self.load(IA2030_SOURCE, &dimension_columns(), &[], |_| true)?;
        Ok(Dimensions::from_table(&table))
    }

    /// UNPD2022 both-sex population of one type, as `(country_code, year, output)`.
    pub fn population(&self, pop_type: &str, output: &str) -> Result<Table> {
        let min_year = f64::from(self.config.years.population_min);
        let column_map = ColumnMap::new(&[("COUNTRY_FK", columns::COUNTRY_CODE), ("YEAR", columns::YEAR), ("VALUE", output)]);
        let table = self.load(
            POPULATION_SOURCE,
            &column_map,
            &["POP_SOURCE_FK", "GENDER_FK", "POP_TYPE_FK"],
            |r| {
                r.text("POP_SOURCE_FK") == Some("UNPD2022")
                    && r.text("GENDER_FK") == Some("BOTH")
                    && r.text("POP_TYPE_FK") == Some(pop_type)
                    && r.num("YEAR") >= min_year
            },
        )?;
        Ok(dedupe(&table, &[columns::COUNTRY_CODE, columns::YEAR]))
    }

    pub fn output_options(&self, window: YearWindow, percent: bool) -> OutputOptions {
        OutputOptions {
            years: window.years(),
            precision: self.config.precision.output,
            percent,
        }
    }
}

/// Raw IA2030 dimension columns and their canonical names.
pub fn dimension_columns() -> ColumnMap {
    ColumnMap::new(&[
        ("COUNTRY", columns::COUNTRY_CODE),
        ("NAMEWORKEN", columns::COUNTRY),
        ("WHOREGIONC", columns::REGION),
        ("GAVI_INCOME_STATUS", columns::INCOME_GROUP),
    ])
}

/// Aggregate `value` at each granularity and shape it for publication.
pub fn publish(
    table: &Table,
    indicator: &str,
    value: &str,
    granularities: &[Granularity],
    options: &OutputOptions,
) -> Vec<SeriesOutput> {
    granularities
        .iter()
        .map(|&granularity| SeriesOutput {
            indicator: indicator.to_string(),
            granularity,
            series: build_nested(&group_mean(table, granularity.group_column(), value), options),
        })
        .collect()
}

pub const BOTH: [Granularity; 2] = [Granularity::Region, Granularity::Country];

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;

    use crate::config::PipelineConfig;

    pub fn config_for(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            data_dir: dir.to_path_buf(),
            output_dir: dir.join("out"),
            ..PipelineConfig::default()
        }
    }

    /// Write a CSV partition from a header and rows.
    pub fn write_partition(dir: &Path, name: &str, header: &str, rows: &[&str]) {
        let mut text = String::from(header);
        text.push('\n');
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        std::fs::write(dir.join(name), text).unwrap();
    }

    pub const IA2030_HEADER: &str = "COUNTRY,NAMEWORKEN,WHOREGIONC,GAVI_INCOME_STATUS,YEAR,TYPE,VALUE_TRANSFORMED";
    pub const POPULATION_HEADER: &str = "COUNTRY_FK,YEAR,POP_SOURCE_FK,GENDER_FK,POP_TYPE_FK,VALUE";
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn population_filters_source_sex_type_and_year() {
        let dir = tempfile::tempdir().unwrap();
        write_partition(
            dir.path(),
            "REF_POPULATIONS_2020.csv",
            POPULATION_HEADER,
            &[
                "AAA,2020,UNPD2022,BOTH,SURVIVING_INFANT,100",
                "AAA,2020,UNPD2022,BOTH,SURVIVING_INFANT,999",
                "AAA,2020,UNPD2019,BOTH,SURVIVING_INFANT,5",
                "AAA,2020,UNPD2022,MALE,SURVIVING_INFANT,5",
                "AAA,2010,UNPD2022,BOTH,SURVIVING_INFANT,5",
                "AAA,2020,UNPD2022,BOTH,TOTAL,5000",
            ],
        );
        let config = config_for(dir.path());
        let ctx = Context::new(&config);
        let infants = ctx.population("SURVIVING_INFANT", "infant").unwrap();
        assert_eq!(infants.len(), 1);
        assert_eq!(infants.rows()[0].num("infant"), 100.0);
    }

    #[test]
    fn missing_filter_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_partition(dir.path(), "REF_POPULATIONS_2020.csv", "COUNTRY_FK,YEAR,VALUE", &["AAA,2020,1"]);
        let config = config_for(dir.path());
        let err = Context::new(&config).population("TOTAL", "population").unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { column, .. } if column == "POP_SOURCE_FK"));
    }

    #[test]
    fn write_puts_tables_and_series_in_their_directories() {
        let dir = tempfile::tempdir().unwrap();
        let output = AnalysisOutput {
            series: vec![SeriesOutput {
                indicator: "vaccine_spent".to_string(),
                granularity: Granularity::Region,
                series: NestedSeries::new(),
            }],
            tables: vec![TableOutput {
                file_name: "cy_ie.csv".to_string(),
                table: Table::from_records([Record::new().with(columns::COUNTRY_CODE, "AAA")]),
            }],
        };
        let written = output.write(dir.path(), &dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("cy_ie.csv").exists());
        assert!(dir.path().join("out").join("vaccine_spent_region.json").exists());
    }
}
