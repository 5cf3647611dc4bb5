//! Dimension normalization: column renames plus label canonicalization.
//!
//! Both maps are plain values handed in by the caller, so a run is fully
//! determined by its inputs.

use std::collections::{BTreeMap, HashMap};

use crate::domain::{IncomeGroup, Region};
use crate::error::{PipelineError, Result};
use crate::table::{Record, Table, Value};

/// Raw column name -> canonical column name.
///
/// Renaming is total: columns without an entry are dropped.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    entries: Vec<(String, String)>,
}

impl ColumnMap {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
        }
    }

    pub fn raw_columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(raw, _)| raw.as_str())
    }

    pub fn canonical_columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, canonical)| canonical.as_str())
    }
}

/// Source label -> display label, applied to cell values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    labels: HashMap<String, String>,
}

impl LabelMap {
    /// Region and income-group renames for the WHO/Gavi sources.
    pub fn who_defaults() -> Self {
        let mut labels = HashMap::new();
        for region in Region::ALL {
            for label in region.source_labels() {
                labels.insert(label.to_string(), region.display_name().to_string());
            }
        }
        for group in IncomeGroup::ALL {
            labels.insert(group.source_label().to_string(), group.display_name().to_string());
        }
        Self { labels }
    }

    /// Defaults extended (or overridden) by configured entries.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (from, to) in overrides {
            self.labels.insert(from.clone(), to.clone());
        }
        self
    }

    pub fn canonical<'a>(&'a self, label: &'a str) -> &'a str {
        self.labels.get(label).map(String::as_str).unwrap_or(label)
    }

    /// Replace every textual cell that matches a known label.
    pub fn apply(&self, table: &mut Table) {
        for row in table.rows_mut() {
            self.apply_record(row);
        }
    }

    fn apply_record(&self, row: &mut Record) {
        for (_, value) in row.iter_mut() {
            if let Value::Text(s) = value {
                if let Some(replacement) = self.labels.get(s.as_str()) {
                    *s = replacement.clone();
                }
            }
        }
    }
}

/// Fail early when a source lacks a column the rename depends on.
pub fn ensure_columns(table: &Table, source_name: &str, columns: &ColumnMap) -> Result<()> {
    for raw in columns.raw_columns() {
        if !table.has_column(raw) {
            return Err(PipelineError::MissingColumn {
                source_name: source_name.to_string(),
                column: raw.to_string(),
            });
        }
    }
    Ok(())
}

/// Rename to canonical columns and canonicalize labels.
pub fn normalize(table: &Table, columns: &ColumnMap, labels: &LabelMap) -> Table {
    let mut out = Table::new();
    for canonical in columns.canonical_columns() {
        out.add_column(canonical);
    }
    for row in table.rows() {
        let mut record = Record::new();
        for (raw, canonical) in &columns.entries {
            let value = row.get(raw);
            if !matches!(value, Value::Missing) {
                record.set(canonical, value.clone());
            }
        }
        labels.apply_record(&mut record);
        out.push(record);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::columns;

    fn raw_row() -> Record {
        Record::new()
            .with("COUNTRY", "AAA")
            .with("WHOREGIONC", "AFRO")
            .with("GAVI_INCOME_STATUS", "Gavi low income")
            .with("YEAR", 2020_i64)
            .with("UNUSED", "dropped")
    }

    #[test]
    fn renames_and_drops_unmapped_columns() {
        let table = Table::from_records([raw_row()]);
        let map = ColumnMap::new(&[
            ("COUNTRY", columns::COUNTRY_CODE),
            ("WHOREGIONC", columns::REGION),
            ("YEAR", columns::YEAR),
        ]);
        let out = normalize(&table, &map, &LabelMap::default());
        assert_eq!(out.columns().len(), 3);
        assert!(!out.has_column("UNUSED"));
        assert_eq!(out.rows()[0].year(), Some(2020));
    }

    #[test]
    fn labels_apply_regardless_of_column_name() {
        let table = Table::from_records([raw_row()]);
        let map = ColumnMap::new(&[
            ("WHOREGIONC", "any_name"),
            ("GAVI_INCOME_STATUS", columns::INCOME_GROUP),
        ]);
        let out = normalize(&table, &map, &LabelMap::who_defaults());
        let row = &out.rows()[0];
        assert_eq!(row.text("any_name"), Some("African Region"));
        assert_eq!(row.text(columns::INCOME_GROUP), Some("Low Income"));
    }

    #[test]
    fn ensure_columns_reports_the_missing_one() {
        let table = Table::from_records([raw_row()]);
        let map = ColumnMap::new(&[("COUNTRY", columns::COUNTRY_CODE), ("NAMEWORKEN", columns::COUNTRY)]);
        let err = ensure_columns(&table, "MT_AD_IA2030", &map).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn { ref column, .. } if column == "NAMEWORKEN"));
    }

    #[test]
    fn overrides_win_over_defaults() {
        let mut overrides = BTreeMap::new();
        overrides.insert("AFRO".to_string(), "Africa".to_string());
        let labels = LabelMap::who_defaults().with_overrides(&overrides);
        assert_eq!(labels.canonical("AFRO"), "Africa");
        assert_eq!(labels.canonical("AFR"), "African Region");
        assert_eq!(labels.canonical("Unknown"), "Unknown");
    }
}
