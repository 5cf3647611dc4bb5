//! Derived indicators.
//!
//! Scalar formulas are plain functions so they can be tested in isolation; the
//! table-level helpers apply them row by row (or per country, for the anchored
//! ones). Division results never leave this module as ±infinity.

use std::collections::HashMap;

use crate::domain::columns;
use crate::table::{Record, Table};

/// IMF WEO subject codes consumed by the fiscal formulas.
pub mod weo {
    /// General government total expenditure, % of GDP.
    pub const GGX_NGDP: &str = "GGX_NGDP";
    /// General government primary net lending/borrowing, % of GDP.
    pub const GGXONLB_NGDP: &str = "GGXONLB_NGDP";
    /// General government net lending/borrowing, % of GDP.
    pub const GGXCNL_NGDP: &str = "GGXCNL_NGDP";
    /// GDP per capita, constant prices, national currency.
    pub const NGDPRPC: &str = "NGDPRPC";
    /// GDP per capita, current prices, national currency.
    pub const NGDPPC: &str = "NGDPPC";
    /// GDP per capita, current prices, U.S. dollars.
    pub const NGDPDPC: &str = "NGDPDPC";
    /// GDP deflator.
    pub const NGDP_D: &str = "NGDP_D";
}

/// Names of derived columns.
pub mod indicators {
    pub const PRIMARY_EXPENDITURE_NGDP: &str = "GGX_MinusInterestPayments_NGDP";
    pub const PRIMARY_EXPENDITURE_NGDPRPC: &str = "GGX_MinusInterestPayments_NGDPRPC";
    pub const PRIMARY_EXPENDITURE_NGDPPC: &str = "GGX_MinusInterestPayments_NGDPPC";
    pub const LCU_INDEX: &str = "GGX_MinusInterestPayments_LCU_index";
    pub const DEFLATOR_REBASE: &str = "NGDP_D_Rebase";
    pub const REBASER_COEFFICIENT: &str = "Rebaser_Coefficient";
    pub const NCU_PER_CAPITA_REBASED: &str = "GGX_MinusInterestPayments_NCU_percapita_rebased";
    pub const IMPLIED_FX: &str = "Implied_FX";
    pub const IMPLIED_FX_REBASE: &str = "Implied_FX_Rebase";
    pub const CONSTANT_USD_PER_CAPITA: &str = "GGX_MinusInterestPayments_ConstantUSD_percapita_rebased";
    pub const ZERO_DOSE: &str = "zerodose";
    pub const EXPENDITURE_PER_INFANT: &str = "expenditure_per_infant";
    pub const DOMESTIC_SHARE: &str = "domestic_share";
}

/// Replace ±infinity by `default`; NaN passes through.
pub fn sanitize(x: f64, default: f64) -> f64 {
    if x.is_infinite() { default } else { x }
}

/// `num / den` with ±infinity mapped to NaN.
pub fn ratio(num: f64, den: f64) -> f64 {
    sanitize(num / den, f64::NAN)
}

/// Total expenditure net of interest payments:
/// `total_expense - (primary_balance - overall_balance)`.
pub fn primary_expenditure(total_expense: f64, primary_balance: f64, net_lending_borrowing: f64) -> f64 {
    total_expense - (primary_balance - net_lending_borrowing)
}

/// Convert a %-of-GDP aggregate to a per-capita amount.
pub fn percent_of_gdp_per_capita(aggregate_pct: f64, gdp_per_capita: f64) -> f64 {
    (aggregate_pct / 100.0) * gdp_per_capita
}

/// Domestic share of total expenditure. Infinite ratios become 0.
pub fn financing_mix(domestic: f64, total: f64) -> f64 {
    sanitize(domestic / total, 0.0)
}

/// Children missing the first dose, rounded to whole children.
pub fn zero_dose(coverage_pct: f64, target: f64) -> f64 {
    (((100.0 - coverage_pct) / 100.0) * target).round()
}

pub fn round_to(x: f64, precision: u32) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let factor = 10f64.powi(precision as i32);
    (x * factor).round() / factor
}

/// Add the primary-expenditure (%GDP) column from the three WEO balances.
pub fn add_primary_expenditure(table: &mut Table) {
    table.derive(indicators::PRIMARY_EXPENDITURE_NGDP, |r| {
        primary_expenditure(r.num(weo::GGX_NGDP), r.num(weo::GGXONLB_NGDP), r.num(weo::GGXCNL_NGDP)).into()
    });
}

/// Add `output = (aggregate / 100) * gdp_per_capita`.
pub fn add_per_capita(table: &mut Table, aggregate: &str, gdp_per_capita: &str, output: &str) {
    table.derive(output, |r| {
        sanitize(percent_of_gdp_per_capita(r.num(aggregate), r.num(gdp_per_capita)), f64::NAN).into()
    });
}

/// Rebase each country's series so its first year at or after `base_year` is 100.
///
/// Returns only the rebased window with `country_code`, `year`, and `output`.
/// Rows are ordered by country then year, so the anchor is deterministic.
pub fn rebased_index(table: &Table, value: &str, output: &str, base_year: i32) -> Table {
    let mut window = table.filter(|r| r.year().is_some_and(|y| y >= base_year));
    window.sort_by_keys_then_year(&[columns::COUNTRY_CODE]);

    let mut anchors: HashMap<String, f64> = HashMap::new();
    let mut out = Table::new();
    for column in [columns::COUNTRY_CODE, columns::YEAR, output] {
        out.add_column(column);
    }
    for row in window.rows() {
        let (Some(code), Some(year)) = (row.text(columns::COUNTRY_CODE), row.year()) else {
            continue;
        };
        let v = row.num(value);
        let anchor = *anchors.entry(code.to_string()).or_insert(v);
        let mut record = Record::new()
            .with(columns::COUNTRY_CODE, code)
            .with(columns::YEAR, i64::from(year));
        record.set(output, ratio(v, anchor) * 100.0);
        out.push(record);
    }
    out
}

/// Propagate each country's `anchor_year` value of `value` to all its rows.
///
/// Within a country (ordered by year) only the anchor row keeps its value,
/// which is then forward-filled and back-filled. Countries without an anchor
/// row get NaN; values never cross country boundaries.
pub fn anchor_fill(table: &mut Table, value: &str, anchor_year: i32, output: &str) {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        if let Some(code) = row.text(columns::COUNTRY_CODE) {
            groups.entry(code.to_string()).or_default().push(i);
        }
    }

    let mut filled = vec![f64::NAN; table.len()];
    for idxs in groups.values_mut() {
        idxs.sort_by_key(|&i| table.rows()[i].year());
        let mut values: Vec<f64> = idxs
            .iter()
            .map(|&i| {
                let row = &table.rows()[i];
                if row.year() == Some(anchor_year) { row.num(value) } else { f64::NAN }
            })
            .collect();
        fill_forward_backward(&mut values);
        for (&i, v) in idxs.iter().zip(values) {
            filled[i] = v;
        }
    }

    table.add_column(output);
    for (row, v) in table.rows_mut().iter_mut().zip(filled) {
        row.set(output, v);
    }
}

/// Forward-fill then back-fill NaN gaps in place.
pub fn fill_forward_backward(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
}

/// Per-capita primary expenditure in constant US dollars of `rebase_year`.
///
/// `per_capita_lcu` is deflated to rebase-year prices with the GDP deflator and
/// converted with the rebase-year implied exchange rate (USD per capita over
/// national currency per capita).
pub fn add_constant_usd_per_capita(table: &mut Table, per_capita_lcu: &str, rebase_year: i32) {
    use indicators::*;

    anchor_fill(table, weo::NGDP_D, rebase_year, DEFLATOR_REBASE);
    table.derive(REBASER_COEFFICIENT, |r| ratio(r.num(DEFLATOR_REBASE), r.num(weo::NGDP_D)).into());
    table.derive(NCU_PER_CAPITA_REBASED, |r| {
        (r.num(per_capita_lcu) * r.num(REBASER_COEFFICIENT)).into()
    });

    table.derive(IMPLIED_FX, |r| ratio(r.num(weo::NGDPDPC), r.num(weo::NGDPPC)).into());
    anchor_fill(table, IMPLIED_FX, rebase_year, IMPLIED_FX_REBASE);

    table.derive(CONSTANT_USD_PER_CAPITA, |r| {
        sanitize(r.num(NCU_PER_CAPITA_REBASED) * r.num(IMPLIED_FX_REBASE), f64::NAN).into()
    });
}

/// One member of the expenditure-ratio family.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioSpec {
    pub denominator: String,
    pub output: String,
}

/// Add `target / denominator` for each ratio, each sanitized independently.
pub fn add_ratios(table: &mut Table, target: &str, specs: &[RatioSpec]) {
    for spec in specs {
        table.derive(&spec.output, |r| ratio(r.num(target), r.num(&spec.denominator)).into());
    }
}

/// Add the domestic financing share (`domestic / total`, infinities as 0).
pub fn add_financing_mix(table: &mut Table, domestic: &str, total: &str, output: &str) {
    table.derive(output, |r| financing_mix(r.num(domestic), r.num(total)).into());
}

/// Round every numeric cell of `targets` to `precision` decimals.
pub fn round_columns(table: &mut Table, targets: &[&str], precision: u32) {
    table.map_numeric(targets, |x| round_to(x, precision));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weo_row(code: &str, year: i64) -> Record {
        Record::new().with(columns::COUNTRY_CODE, code).with(columns::YEAR, year)
    }

    #[test]
    fn primary_expenditure_is_row_local() {
        // 30% total, primary balance -1%, overall balance -3% => interest 2%.
        assert_eq!(primary_expenditure(30.0, -1.0, -3.0), 28.0);
        assert_eq!(percent_of_gdp_per_capita(28.0, 1000.0), 280.0);
    }

    #[test]
    fn rebased_index_anchors_first_year_at_100() {
        let table = Table::from_records([
            weo_row("AAA", 2025).with("v", 60.0),
            weo_row("AAA", 2022).with("v", 10.0),
            weo_row("AAA", 2023).with("v", 50.0),
            weo_row("AAA", 2024).with("v", 55.0),
            weo_row("BBB", 2024).with("v", 8.0),
            weo_row("BBB", 2026).with("v", 4.0),
        ]);
        let out = rebased_index(&table, "v", "idx", 2023);
        let rows = out.rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].year(), Some(2023));
        assert_eq!(rows[0].num("idx"), 100.0);
        assert!((rows[1].num("idx") - 110.0).abs() < 1e-9);
        assert!((rows[2].num("idx") - 120.0).abs() < 1e-9);
        // BBB has no 2023 row: its first row in the window is the anchor.
        assert_eq!(rows[3].num("idx"), 100.0);
        assert_eq!(rows[4].num("idx"), 50.0);
    }

    #[test]
    fn rebased_index_with_zero_anchor_is_nan_not_infinite() {
        let table = Table::from_records([weo_row("AAA", 2023).with("v", 0.0), weo_row("AAA", 2024).with("v", 5.0)]);
        let out = rebased_index(&table, "v", "idx", 2023);
        assert!(out.rows().iter().all(|r| r.num("idx").is_nan()));
    }

    #[test]
    fn anchor_fill_stays_within_country() {
        let mut table = Table::from_records([
            weo_row("AAA", 2023).with("d", 90.0),
            weo_row("AAA", 2024).with("d", 100.0),
            weo_row("AAA", 2025).with("d", 110.0),
            weo_row("BBB", 2023).with("d", 50.0),
        ]);
        anchor_fill(&mut table, "d", 2024, "d_rebase");
        let filled: Vec<f64> = table.rows().iter().map(|r| r.num("d_rebase")).collect();
        assert_eq!(&filled[..3], &[100.0, 100.0, 100.0]);
        assert!(filled[3].is_nan());
    }

    #[test]
    fn fill_forward_then_backward() {
        let mut v = [f64::NAN, 2.0, f64::NAN, f64::NAN];
        fill_forward_backward(&mut v);
        assert_eq!(v, [2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn constant_usd_uses_rebase_year_deflator_and_fx() {
        let mut table = Table::from_records([
            weo_row("AAA", 2023)
                .with("pc", 100.0)
                .with(weo::NGDP_D, 80.0)
                .with(weo::NGDPDPC, 10.0)
                .with(weo::NGDPPC, 100.0),
            weo_row("AAA", 2024)
                .with("pc", 120.0)
                .with(weo::NGDP_D, 100.0)
                .with(weo::NGDPDPC, 20.0)
                .with(weo::NGDPPC, 100.0),
        ]);
        add_constant_usd_per_capita(&mut table, "pc", 2024);
        let rows = table.rows();
        assert_eq!(rows[0].num(indicators::REBASER_COEFFICIENT), 1.25);
        // 100 * 1.25 * 0.2
        assert!((rows[0].num(indicators::CONSTANT_USD_PER_CAPITA) - 25.0).abs() < 1e-9);
        // 120 * 1.0 * 0.2
        assert!((rows[1].num(indicators::CONSTANT_USD_PER_CAPITA) - 24.0).abs() < 1e-9);
    }

    #[test]
    fn ratio_family_sanitizes_infinity_to_nan() {
        let mut table = Table::from_records([Record::new().with("tev", 5.0).with("gdp", 0.0).with("pop", 10.0)]);
        let specs = [
            RatioSpec { denominator: "gdp".to_string(), output: "tev_gdp".to_string() },
            RatioSpec { denominator: "pop".to_string(), output: "tev_pop".to_string() },
        ];
        add_ratios(&mut table, "tev", &specs);
        assert!(table.rows()[0].num("tev_gdp").is_nan());
        assert_eq!(table.rows()[0].num("tev_pop"), 0.5);
    }

    #[test]
    fn financing_mix_sanitizes_infinity_to_zero() {
        assert_eq!(financing_mix(5.0, 0.0), 0.0);
        assert_eq!(financing_mix(-5.0, 0.0), 0.0);
        assert!(financing_mix(0.0, 0.0).is_nan());
        assert_eq!(financing_mix(3.0, 4.0), 0.75);
    }

    #[test]
    fn zero_dose_rounds_to_whole_children() {
        assert_eq!(zero_dose(90.0, 1001.0), 100.0);
    }

    #[test]
    fn round_columns_leaves_text_alone() {
        let mut table = Table::from_records([Record::new().with("v", 1.23456).with("c", "AAA")]);
        round_columns(&mut table, &["v", "c"], 3);
        assert_eq!(table.rows()[0].num("v"), 1.235);
        assert_eq!(table.rows()[0].text("c"), Some("AAA"));
    }
}
