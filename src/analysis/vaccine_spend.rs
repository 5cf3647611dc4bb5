//! Vaccine expenditure per surviving infant.
//!
//! IA2030 total expenditure on vaccines (`TEV`) and on routine immunization
//! (`TERI`) is divided by the surviving-infant population. Country-years where
//! either type is reported as exactly zero are treated as non-reporting and
//! dropped before averaging `TEV` per infant.

use tracing::info;

use crate::analysis::{AnalysisOutput, BOTH, Context, IA2030_SOURCE, publish};
use crate::domain::columns;
use crate::error::Result;
use crate::table::Table;
use crate::transform::derive::{indicators::EXPENDITURE_PER_INFANT, ratio, round_columns};
use crate::transform::join::{dedupe, join, pivot_mean};
use crate::transform::{ColumnMap, Dimensions, JoinKey, JoinKind};

pub const INDICATOR: &str = "vaccine_spent";
pub const TEV: &str = "TEV";
pub const TERI: &str = "TERI";

pub const VACCINE: &str = "vaccine";
pub const EXPENDITURE: &str = "expenditure";
const INFANT: &str = "infant";

pub fn expenditure_columns() -> ColumnMap {
    ColumnMap::new(&[
        ("COUNTRY", columns::COUNTRY_CODE),
        ("NAMEWORKEN", columns::COUNTRY),
        ("WHOREGIONC", columns::REGION),
        ("GAVI_INCOME_STATUS", columns::INCOME_GROUP),
        ("YEAR", columns::YEAR),
        ("TYPE", VACCINE),
        ("VALUE_TRANSFORMED", EXPENDITURE),
    ])
}

/// IA2030 expenditure rows of the given types, one per country, year, and type.
pub fn load_expenditure(ctx: &Context<'_>, types: &[&str]) -> Result<Table> {
    let table = ctx.load(IA2030_SOURCE, &expenditure_columns(), &[], |r| {
        r.text("TYPE").is_some_and(|t| types.iter().any(|&wanted| wanted == t))
    })?;
    Ok(dedupe(&table, &[columns::COUNTRY_CODE, columns::YEAR, VACCINE]))
}

pub fn run(ctx: &Context<'_>) -> Result<AnalysisOutput> {
    let expenditure = load_expenditure(ctx, &[TEV, TERI])?;
    let infants = ctx.population("SURVIVING_INFANT", INFANT)?;

    let mut joined = join(&expenditure, &infants, JoinKey::CountryCode, JoinKind::Left);
    joined.derive(EXPENDITURE_PER_INFANT, |r| ratio(r.num(EXPENDITURE), r.num(INFANT)).into());
    round_columns(&mut joined, &[EXPENDITURE_PER_INFANT], ctx.config.precision.table);

    let dims = Dimensions::from_table(&joined);
    let wide = pivot_mean(&joined, JoinKey::CountryCode, VACCINE, EXPENDITURE_PER_INFANT);
    let reporting = dims
        .attach(&wide)
        .filter(|r| r.num(TEV) != 0.0 && r.num(TERI) != 0.0);
    info!(
        countries = dims.len(),
        rows = reporting.len(),
        dropped = wide.len() - reporting.len(),
        "vaccine spend per infant"
    );

    let options = ctx.output_options(ctx.config.windows.vaccine_spend, false);
    Ok(AnalysisOutput {
        series: publish(&reporting, INDICATOR, TEV, &BOTH, &options),
        tables: Vec::new(),
    })
}
