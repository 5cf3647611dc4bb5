//! Group-by-year means.

use std::collections::BTreeMap;

use tracing::debug;

use crate::table::Table;

/// `group -> year -> mean`, NaN where a group-year had no finite values.
pub type GroupedSeries = BTreeMap<String, BTreeMap<i32, f64>>;

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, x: f64) {
        if !x.is_nan() {
            self.sum += x;
            self.count += 1;
        }
    }

    fn mean(self) -> f64 {
        if self.count == 0 { f64::NAN } else { self.sum / self.count as f64 }
    }
}

/// Mean of `value` for each `(group, year)`, ignoring NaN.
///
/// Rows are visited in ascending year order. A group-year whose values are all
/// NaN is kept with a NaN mean. Rows without a group label or year cannot be
/// keyed and are skipped.
pub fn group_mean(table: &Table, group: &str, value: &str) -> GroupedSeries {
    let mut rows: Vec<_> = table.rows().iter().collect();
    rows.sort_by_key(|r| r.year());

    let mut acc: BTreeMap<String, BTreeMap<i32, Accumulator>> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in rows {
        let (Some(label), Some(year)) = (row.text(group), row.year()) else {
            skipped += 1;
            continue;
        };
        acc.entry(label.to_string())
            .or_default()
            .entry(year)
            .or_default()
            .add(row.num(value));
    }
    if skipped > 0 {
        debug!(skipped, group, value, "rows without group key");
    }

    acc.into_iter()
        .map(|(label, years)| (label, years.into_iter().map(|(y, a)| (y, a.mean())).collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::columns;
    use crate::table::Record;

    fn row(region: &str, year: i64, v: f64) -> Record {
        Record::new()
            .with(columns::REGION, region)
            .with(columns::YEAR, year)
            .with("TEV", v)
    }

    #[test]
    fn mean_skips_nan() {
        let table = Table::from_records([row("R", 2020, 10.0), row("R", 2020, f64::NAN), row("R", 2020, 20.0)]);
        let series = group_mean(&table, columns::REGION, "TEV");
        assert_eq!(series["R"][&2020], 15.0);
    }

    #[test]
    fn all_nan_group_is_kept_as_nan() {
        let table = Table::from_records([row("R", 2020, f64::NAN), row("S", 2021, 1.0)]);
        let series = group_mean(&table, columns::REGION, "TEV");
        assert_eq!(series.len(), 2);
        assert!(series["R"][&2020].is_nan());
    }

    #[test]
    fn rows_without_group_are_skipped() {
        let table = Table::from_records([
            Record::new().with(columns::YEAR, 2020_i64).with("TEV", 1.0),
            row("R", 2020, 3.0),
        ]);
        let series = group_mean(&table, columns::REGION, "TEV");
        assert_eq!(series.len(), 1);
        assert_eq!(series["R"][&2020], 3.0);
    }
}
