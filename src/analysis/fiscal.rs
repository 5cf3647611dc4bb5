//! Fiscal space: primary government expenditure from the IMF WEO.
//!
//! Produces the LCU index (real per-capita primary expenditure relative to the
//! base year), constant-USD per-capita primary expenditure at rebase-year
//! prices and exchange rate, and DTPCV1 zero-dose counts. The combined
//! country-year table is persisted as `cy_ie.csv`.

use tracing::info;

use crate::analysis::{AnalysisOutput, BOTH, Context, TableOutput, publish};
use crate::domain::{Granularity, columns};
use crate::error::Result;
use crate::table::Table;
use crate::transform::derive::indicators::{
    CONSTANT_USD_PER_CAPITA, LCU_INDEX, PRIMARY_EXPENDITURE_NGDP, PRIMARY_EXPENDITURE_NGDPPC,
    PRIMARY_EXPENDITURE_NGDPRPC, ZERO_DOSE,
};
use crate::transform::derive::{
    add_constant_usd_per_capita, add_per_capita, add_primary_expenditure, rebased_index, round_columns, weo,
    zero_dose,
};
use crate::transform::join::{dedupe, join, retain_repeated};
use crate::transform::{Classifier, ColumnMap, JoinKey, JoinKind};

pub const WEO_SOURCE: &str = "cy_imf_weo";
pub const COVERAGE_SOURCE: &str = "AD_COVERAGES";
pub const IE_TABLE: &str = "cy_ie.csv";

pub const INDEX_INDICATOR: &str = "fiscal_space_index";
pub const USD_INDICATOR: &str = "constant_usd_per_capita";
pub const GROUP_INDICATOR: &str = "fiscal_space_group";

const TARGET_NUMBER: &str = "TARGETNUMBER";
const DTPCV1: &str = "DTPCV1";

fn weo_columns() -> ColumnMap {
    ColumnMap::new(&[
        (columns::COUNTRY_CODE, columns::COUNTRY_CODE),
        (columns::YEAR, columns::YEAR),
        (weo::GGX_NGDP, weo::GGX_NGDP),
        (weo::GGXONLB_NGDP, weo::GGXONLB_NGDP),
        (weo::GGXCNL_NGDP, weo::GGXCNL_NGDP),
        (weo::NGDPRPC, weo::NGDPRPC),
        (weo::NGDPPC, weo::NGDPPC),
        (weo::NGDPDPC, weo::NGDPDPC),
        (weo::NGDP_D, weo::NGDP_D),
    ])
}

/// WUENIC DTPCV1 coverage in the zero-dose year, with the zero-dose count.
pub fn zero_dose_table(ctx: &Context<'_>) -> Result<Table> {
    let year = f64::from(ctx.config.years.zerodose);
    let column_map = ColumnMap::new(&[
        ("COUNTRY", columns::COUNTRY_CODE),
        ("YEAR", columns::YEAR),
        ("TARGETNUMBER", TARGET_NUMBER),
        ("PERCENTAGE", DTPCV1),
    ]);
    let coverage = ctx.load(COVERAGE_SOURCE, &column_map, &["VACCINECODE", "COVERAGE_CATEGORY"], |r| {
        r.num("YEAR") == year && r.text("VACCINECODE") == Some("DTPCV1") && r.text("COVERAGE_CATEGORY") == Some("WUENIC")
    })?;
    let mut table = dedupe(&coverage, &[columns::COUNTRY_CODE, columns::YEAR]);
    table.derive(ZERO_DOSE, |r| zero_dose(r.num(DTPCV1), r.num(TARGET_NUMBER)).into());
    Ok(table)
}

/// The persisted `cy_ie` table: LCU index, constant-USD per capita, zero-dose.
pub fn country_year_table(ctx: &Context<'_>) -> Result<Table> {
    let years = ctx.config.years;
    let weo_table = ctx.load(WEO_SOURCE, &weo_columns(), &[], |_| true)?;
    let mut weo_table = dedupe(&weo_table, &[columns::COUNTRY_CODE, columns::YEAR]);

    add_primary_expenditure(&mut weo_table);
    add_per_capita(&mut weo_table, PRIMARY_EXPENDITURE_NGDP, weo::NGDPRPC, PRIMARY_EXPENDITURE_NGDPRPC);
    add_per_capita(&mut weo_table, PRIMARY_EXPENDITURE_NGDP, weo::NGDPPC, PRIMARY_EXPENDITURE_NGDPPC);

    // Countries need a base-year row and at least one later year to be indexed.
    let index = retain_repeated(
        &rebased_index(&weo_table, PRIMARY_EXPENDITURE_NGDPRPC, LCU_INDEX, years.base),
        JoinKey::CountryCode,
    );

    add_constant_usd_per_capita(&mut weo_table, PRIMARY_EXPENDITURE_NGDPPC, years.rebase);
    let usd = weo_table.select(&[columns::COUNTRY_CODE, columns::YEAR, CONSTANT_USD_PER_CAPITA]);

    let zerodose = zero_dose_table(ctx)?;

    let mut ie = join(&index, &usd, JoinKey::CountryCode, JoinKind::Outer);
    ie = join(&ie, &zerodose, JoinKey::CountryCode, JoinKind::Outer);
    ie.sort_by_keys_then_year(&[columns::COUNTRY_CODE]);
    round_columns(&mut ie, &[LCU_INDEX, CONSTANT_USD_PER_CAPITA], ctx.config.precision.derived);
    info!(
        indexed = index.distinct_text(columns::COUNTRY_CODE).len(),
        zerodose = zerodose.len(),
        rows = ie.len(),
        "built country-year fiscal table"
    );
    Ok(ie)
}

pub fn run(ctx: &Context<'_>) -> Result<AnalysisOutput> {
    let ie = country_year_table(ctx)?;
    let dims = ctx.dimensions()?;

    let mut published = dims.attach(&ie);
    Classifier::symmetric(ctx.config.thresholds.fiscal).classify_column(&mut published, LCU_INDEX, GROUP_INDICATOR);

    let options = ctx.output_options(ctx.config.windows.fiscal, false);
    let mut series = publish(&published, INDEX_INDICATOR, LCU_INDEX, &BOTH, &options);
    series.extend(publish(&published, USD_INDICATOR, CONSTANT_USD_PER_CAPITA, &BOTH, &options));
    series.extend(publish(&published, GROUP_INDICATOR, GROUP_INDICATOR, &[Granularity::Country], &options));

    Ok(AnalysisOutput {
        series,
        tables: vec![TableOutput {
            file_name: IE_TABLE.to_string(),
            table: ie,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::*;

    const WEO_HEADER: &str = "country_code,year,GGX_NGDP,GGXONLB_NGDP,GGXCNL_NGDP,NGDPRPC,NGDPPC,NGDPDPC,NGDP_D";

    fn seed(dir: &std::path::Path) {
        write_partition(
            dir,
            "cy_imf_weo.csv",
            WEO_HEADER,
            &[
                "AAA,2022,30,-1,-3,950,1900,950,95",
                "AAA,2023,30,-1,-3,1000,2000,1000,100",
                "AAA,2024,30,-1,-3,1100,2200,1100,110",
                "AAA,2025,30,-1,-3,900,2500,1250,125",
                "BBB,2023,20,0,0,500,500,500,100",
            ],
        );
        write_partition(
            dir,
            "AD_COVERAGES_2022.csv",
            "COUNTRY,YEAR,VACCINECODE,COVERAGE_CATEGORY,PERCENTAGE,TARGETNUMBER",
            &[
                "AAA,2022,DTPCV1,WUENIC,90,1000",
                "AAA,2022,DTPCV3,WUENIC,80,1000",
                "AAA,2022,DTPCV1,ADMIN,99,1000",
            ],
        );
        write_partition(dir, "MT_AD_IA2030_2023.csv", IA2030_HEADER, &["AAA,Alpha,AFRO,Gavi low income,2023,TEV,1"]);
    }

    #[test]
    fn index_usd_and_groups_for_an_indexed_country() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let config = config_for(dir.path());
        let output = run(&Context::new(&config)).unwrap();

        let find = |indicator: &str, granularity: Granularity| {
            output
                .series
                .iter()
                .find(|s| s.indicator == indicator && s.granularity == granularity)
                .unwrap()
        };

        let index = &find(INDEX_INDICATOR, Granularity::Region).series["African Region"];
        assert_eq!(index.len(), 7);
        assert_eq!(index[&2023], 100.0);
        assert_eq!(index[&2024], 110.0);
        assert_eq!(index[&2025], 90.0);
        assert!(index[&2029].is_nan());
        assert!(!index.contains_key(&2022));

        let usd = &find(USD_INDICATOR, Granularity::Country).series["Alpha"];
        assert_eq!(usd[&2024], 308.0);
        assert_eq!(usd[&2025], 308.0);

        let groups = &find(GROUP_INDICATOR, Granularity::Country).series["Alpha"];
        assert_eq!((groups[&2023], groups[&2024], groups[&2025]), (3.0, 4.0, 2.0));
        assert!(output.series.iter().all(|s| !(s.indicator == GROUP_INDICATOR && s.granularity == Granularity::Region)));
    }

    #[test]
    fn persisted_table_keeps_unindexed_and_zero_dose_rows() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());
        let config = config_for(dir.path());
        let ie = country_year_table(&Context::new(&config)).unwrap();

        let bbb: Vec<_> = ie.rows().iter().filter(|r| r.text(columns::COUNTRY_CODE) == Some("BBB")).collect();
        assert_eq!(bbb.len(), 1);
        assert!(bbb[0].get(LCU_INDEX).is_missing());

        let zd = ie
            .rows()
            .iter()
            .find(|r| r.text(columns::COUNTRY_CODE) == Some("AAA") && r.year() == Some(2022))
            .unwrap();
        assert_eq!(zd.num(ZERO_DOSE), 100.0);
        assert_eq!(zd.num(DTPCV1), 90.0);
    }
}
