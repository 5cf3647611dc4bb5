//! Key-based joins, deduplication, and pivoting.
//!
//! Every join names its key explicitly through [`JoinKey`]; there is no
//! implicit "join on shared columns".

use std::collections::HashMap;

use tracing::debug;

use crate::domain::columns;
use crate::table::{Record, Table, Value};

/// Entity half of a `(entity, year)` join key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKey {
    CountryCode,
    Country,
}

impl JoinKey {
    pub fn entity_column(self) -> &'static str {
        match self {
            JoinKey::CountryCode => columns::COUNTRY_CODE,
            JoinKey::Country => columns::COUNTRY,
        }
    }

    fn entity_of(self, row: &Record) -> Option<&str> {
        row.text(self.entity_column())
    }

    fn of(self, row: &Record) -> Option<(String, i32)> {
        Some((self.entity_of(row)?.to_string(), row.year()?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Outer,
}

/// Merge `right` into `left` on `(key, year)`.
///
/// Shared non-key columns keep the left value unless it is missing. Rows with
/// an incomplete key never match but are still kept by `Left`/`Outer` on their
/// own side.
pub fn join(left: &Table, right: &Table, key: JoinKey, kind: JoinKind) -> Table {
    let mut index: HashMap<(String, i32), Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if let Some(k) = key.of(row) {
            index.entry(k).or_default().push(i);
        }
    }

    let mut out = Table::new();
    for column in left.columns().iter().chain(right.columns()) {
        out.add_column(column);
    }

    let mut right_matched = vec![false; right.len()];
    for row in left.rows() {
        match key.of(row).and_then(|k| index.get(&k)) {
            Some(hits) => {
                for &i in hits {
                    right_matched[i] = true;
                    out.push(merge_rows(row, &right.rows()[i]));
                }
            }
            None if kind != JoinKind::Inner => out.push(row.clone()),
            None => {}
        }
    }

    if kind == JoinKind::Outer {
        for (row, matched) in right.rows().iter().zip(&right_matched) {
            if !matched {
                out.push(row.clone());
            }
        }
    }

    debug!(
        left = left.len(),
        right = right.len(),
        out = out.len(),
        key = key.entity_column(),
        ?kind,
        "joined tables"
    );
    out
}

fn merge_rows(left: &Record, right: &Record) -> Record {
    let mut merged = left.clone();
    for (column, value) in right.iter() {
        if merged.get(column).is_missing() {
            merged.set(column, value.clone());
        }
    }
    merged
}

/// Keep the first row for each distinct combination of `keys`.
pub fn dedupe(table: &Table, keys: &[&str]) -> Table {
    let mut seen = std::collections::HashSet::new();
    let before = table.len();
    let out = table.filter(|row| {
        let k: Vec<String> = keys.iter().map(|c| row.get(c).to_cell()).collect();
        seen.insert(k)
    });
    if out.len() != before {
        debug!(dropped = before - out.len(), ?keys, "removed duplicate keys");
    }
    out
}

/// Drop entities that appear in at most one row.
pub fn retain_repeated(table: &Table, key: JoinKey) -> Table {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in table.rows() {
        if let Some(entity) = key.entity_of(row) {
            *counts.entry(entity).or_default() += 1;
        }
    }
    table.filter(|row| {
        key.entity_of(row)
            .and_then(|e| counts.get(e))
            .is_some_and(|&n| n > 1)
    })
}

/// Widen long observations: one row per `(key, year)`, one column per distinct
/// value of `column`, duplicates averaged ignoring NaN.
pub fn pivot_mean(table: &Table, key: JoinKey, column: &str, value: &str) -> Table {
    let mut order: Vec<(String, i32)> = Vec::new();
    let mut cells: HashMap<(String, i32), HashMap<String, (f64, usize)>> = HashMap::new();
    let mut names: Vec<String> = Vec::new();

    for row in table.rows() {
        let (Some(k), Some(name)) = (key.of(row), row.text(column)) else {
            continue;
        };
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        let group = cells.entry(k.clone()).or_insert_with(|| {
            order.push(k);
            HashMap::new()
        });
        let slot = group.entry(name.to_string()).or_insert((0.0, 0));
        let v = row.num(value);
        if v.is_finite() {
            slot.0 += v;
            slot.1 += 1;
        }
    }

    let mut out = Table::new();
    out.add_column(key.entity_column());
    out.add_column(columns::YEAR);
    for name in &names {
        out.add_column(name);
    }
    for k in order {
        let mut record = Record::new()
            .with(key.entity_column(), k.0.as_str())
            .with(columns::YEAR, i64::from(k.1));
        if let Some(group) = cells.get(&k) {
            for (name, (sum, n)) in group {
                let mean = if *n == 0 { f64::NAN } else { sum / *n as f64 };
                record.set(name, mean);
            }
        }
        out.push(record);
    }
    out
}

/// Country dimensions (name, region, income group) keyed by country code.
///
/// The first row seen for a code fixes its canonical name for the run.
#[derive(Debug, Clone, Default)]
pub struct Dimensions {
    by_code: HashMap<String, Record>,
}

const DIMENSION_COLUMNS: [&str; 3] = [columns::COUNTRY, columns::REGION, columns::INCOME_GROUP];

impl Dimensions {
    pub fn from_table(table: &Table) -> Self {
        let mut by_code = HashMap::new();
        for row in table.rows() {
            let Some(code) = row.text(columns::COUNTRY_CODE) else {
                continue;
            };
            by_code.entry(code.to_string()).or_insert_with(|| {
                let mut dims = Record::new();
                for column in DIMENSION_COLUMNS {
                    if let Value::Text(s) = row.get(column) {
                        dims.set(column, s.as_str());
                    }
                }
                dims
            });
        }
        Self { by_code }
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Overwrite the dimension columns of every row from its country code.
    pub fn attach(&self, table: &Table) -> Table {
        let mut out = table.clone();
        for column in DIMENSION_COLUMNS {
            out.add_column(column);
        }
        for row in out.rows_mut() {
            let dims = row
                .text(columns::COUNTRY_CODE)
                .and_then(|code| self.by_code.get(code))
                .cloned();
            if let Some(dims) = dims {
                for (column, value) in dims.iter() {
                    row.set(column, value.clone());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(code: &str, year: i64, column: &str, v: f64) -> Record {
        Record::new()
            .with(columns::COUNTRY_CODE, code)
            .with(columns::YEAR, year)
            .with(column, v)
    }

    #[test]
    fn left_join_keeps_unmatched_left_rows() {
        let left = Table::from_records([obs("AAA", 2020, "expenditure", 10.0), obs("BBB", 2020, "expenditure", 5.0)]);
        let right = Table::from_records([obs("AAA", 2020, "infant", 2.0)]);
        let out = join(&left, &right, JoinKey::CountryCode, JoinKind::Left);
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0].num("infant"), 2.0);
        assert!(out.rows()[1].num("infant").is_nan());
    }

    #[test]
    fn outer_join_keeps_both_sides_with_nan() {
        let left = Table::from_records([obs("AAA", 2023, "lcu", 100.0)]);
        let right = Table::from_records([obs("CCC", 2022, "zerodose", 7.0)]);
        let out = join(&left, &right, JoinKey::CountryCode, JoinKind::Outer);
        assert_eq!(out.len(), 2);
        assert!(out.rows()[0].num("zerodose").is_nan());
        assert!(out.rows()[1].num("lcu").is_nan());
        assert!(out.has_column("lcu") && out.has_column("zerodose"));
    }

    #[test]
    fn inner_join_drops_unmatched() {
        let left = Table::from_records([obs("AAA", 2023, "a", 1.0), obs("AAA", 2024, "a", 2.0)]);
        let right = Table::from_records([obs("AAA", 2024, "b", 3.0)]);
        let out = join(&left, &right, JoinKey::CountryCode, JoinKind::Inner);
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0].year(), Some(2024));
    }

    #[test]
    fn shared_column_prefers_left_unless_missing() {
        let left = Table::from_records([obs("AAA", 2023, "x", f64::NAN).with("y", 1.0)]);
        let right = Table::from_records([obs("AAA", 2023, "x", 9.0).with("y", 2.0)]);
        let out = join(&left, &right, JoinKey::CountryCode, JoinKind::Left);
        assert_eq!(out.rows()[0].num("x"), 9.0);
        assert_eq!(out.rows()[0].num("y"), 1.0);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let table = Table::from_records([
            obs("AAA", 2020, "v", 1.0).with(columns::INDICATOR, "GDP"),
            obs("AAA", 2020, "v", 2.0).with(columns::INDICATOR, "GDP"),
            obs("AAA", 2020, "v", 3.0).with(columns::INDICATOR, "CHE"),
        ]);
        let out = dedupe(&table, &[columns::COUNTRY_CODE, columns::YEAR, columns::INDICATOR]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0].num("v"), 1.0);
    }

    #[test]
    fn retain_repeated_drops_singletons() {
        let table = Table::from_records([
            obs("AAA", 2023, "v", 1.0),
            obs("AAA", 2024, "v", 2.0),
            obs("BBB", 2023, "v", 3.0),
        ]);
        let out = retain_repeated(&table, JoinKey::CountryCode);
        assert_eq!(out.len(), 2);
        assert!(out.rows().iter().all(|r| r.text(columns::COUNTRY_CODE) == Some("AAA")));
    }

    #[test]
    fn pivot_averages_duplicates_and_skips_nan() {
        let table = Table::from_records([
            obs("AAA", 2020, "value", 10.0).with("vaccine", "TEV"),
            obs("AAA", 2020, "value", 20.0).with("vaccine", "TEV"),
            obs("AAA", 2020, "value", f64::NAN).with("vaccine", "TEV"),
            obs("AAA", 2020, "value", 4.0).with("vaccine", "TERI"),
        ]);
        let out = pivot_mean(&table, JoinKey::CountryCode, "vaccine", "value");
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0].num("TEV"), 15.0);
        assert_eq!(out.rows()[0].num("TERI"), 4.0);
    }

    fn named(country: &str, code: &str, year: i64, column: &str, v: f64) -> Record {
        obs(code, year, column, v).with(columns::COUNTRY, country)
    }

    #[test]
    fn country_join_matches_on_name_not_code() {
        let left = Table::from_records([
            named("Alpha", "AAA", 2022, "zerodose", 5.0),
            named("Beta", "BBB", 2022, "zerodose", 6.0),
        ]);
        let right = Table::from_records([
            named("Alpha", "XXX", 2022, "pct_diff", 1.5),
            named("Beta", "BBB", 2021, "pct_diff", 2.5),
        ]);
        let out = join(&left, &right, JoinKey::Country, JoinKind::Left);
        assert_eq!(out.len(), 2);
        let alpha = &out.rows()[0];
        assert_eq!(alpha.num("pct_diff"), 1.5);
        assert_eq!(alpha.text(columns::COUNTRY_CODE), Some("AAA"));
        assert!(out.rows()[1].num("pct_diff").is_nan());
    }

    #[test]
    fn country_rows_without_a_name_never_match() {
        let left = Table::from_records([obs("AAA", 2022, "a", 1.0)]);
        let right = Table::from_records([obs("AAA", 2022, "b", 2.0)]);
        assert!(join(&left, &right, JoinKey::Country, JoinKind::Inner).is_empty());
    }

    #[test]
    fn retain_repeated_by_country_name() {
        let table = Table::from_records([
            named("Alpha", "AAA", 2023, "v", 1.0),
            named("Alpha", "XXX", 2024, "v", 2.0),
            named("Beta", "BBB", 2023, "v", 3.0),
        ]);
        let out = retain_repeated(&table, JoinKey::Country);
        assert_eq!(out.len(), 2);
        assert!(out.rows().iter().all(|r| r.text(columns::COUNTRY) == Some("Alpha")));
    }

    #[test]
    fn pivot_by_country_keys_rows_on_name() {
        let table = Table::from_records([
            named("Alpha", "AAA", 2020, "value", 10.0).with("vaccine", "TEV"),
            named("Alpha", "XXX", 2020, "value", 30.0).with("vaccine", "TEV"),
        ]);
        let out = pivot_mean(&table, JoinKey::Country, "vaccine", "value");
        assert_eq!(out.len(), 1);
        assert!(out.has_column(columns::COUNTRY));
        assert!(!out.has_column(columns::COUNTRY_CODE));
        assert_eq!(out.rows()[0].text(columns::COUNTRY), Some("Alpha"));
        assert_eq!(out.rows()[0].num("TEV"), 20.0);
    }

    #[test]
    fn dimensions_fix_one_name_per_code() {
        let dims = Table::from_records([
            Record::new().with(columns::COUNTRY_CODE, "AAA").with(columns::COUNTRY, "Alpha"),
            Record::new().with(columns::COUNTRY_CODE, "AAA").with(columns::COUNTRY, "Alpha (old)"),
        ]);
        let dims = Dimensions::from_table(&dims);
        let table = Table::from_records([obs("AAA", 2023, "v", 1.0)]);
        let out = dims.attach(&table);
        assert_eq!(out.rows()[0].text(columns::COUNTRY), Some("Alpha"));
    }
}
