//! Immunization financing ratios.
//!
//! Total expenditure on vaccines is set against population, GDP and the health
//! expenditure aggregates of `REF_FINANCING`. The domestic share of current
//! health expenditure (GGHE-D / CHE) is published and bucketed.

use tracing::info;

use crate::analysis::vaccine_spend::{EXPENDITURE, TEV, load_expenditure};
use crate::analysis::{AnalysisOutput, BOTH, Context, publish};
use crate::domain::{Granularity, columns};
use crate::error::Result;
use crate::table::Table;
use crate::transform::derive::indicators::DOMESTIC_SHARE;
use crate::transform::derive::{RatioSpec, add_financing_mix, add_ratios, round_columns};
use crate::transform::join::{dedupe, join, pivot_mean};
use crate::transform::{Classifier, ColumnMap, Dimensions, JoinKey, JoinKind};

pub const FINANCING_SOURCE: &str = "REF_FINANCING";

pub const PER_CAPITA_INDICATOR: &str = "vaccine_spent_per_capita";
pub const DOMESTIC_SHARE_GROUP: &str = "domestic_share_group";

const POPULATION: &str = "population";

/// `REF_FINANCING` indicators of interest, one column per code.
pub fn financing_table(ctx: &Context<'_>) -> Result<Table> {
    let codes = &ctx.config.financing;
    let wanted = [&codes.gdp, &codes.che, &codes.phc, &codes.gghe_d, &codes.ext];
    let column_map = ColumnMap::new(&[
        ("COUNTRY_FK", columns::COUNTRY_CODE),
        ("YEAR", columns::YEAR),
        ("INDICATOR_FK", columns::INDICATOR),
        ("VALUE", columns::VALUE),
    ]);
    let long = ctx.load(FINANCING_SOURCE, &column_map, &[], |r| {
        r.text("INDICATOR_FK").is_some_and(|code| wanted.iter().any(|w| w.as_str() == code))
    })?;
    let long = dedupe(&long, &[columns::COUNTRY_CODE, columns::YEAR, columns::INDICATOR]);
    Ok(pivot_mean(&long, JoinKey::CountryCode, columns::INDICATOR, columns::VALUE))
}

/// Ratio outputs: per-capita first, then the shares published as percentages.
fn ratio_specs(ctx: &Context<'_>) -> (RatioSpec, Vec<RatioSpec>) {
    let codes = &ctx.config.financing;
    let per_capita = RatioSpec {
        denominator: POPULATION.to_string(),
        output: PER_CAPITA_INDICATOR.to_string(),
    };
    let shares = [
        (&codes.gdp, "gdp"),
        (&codes.che, "che"),
        (&codes.phc, "phc"),
        (&codes.gghe_d, "gghe_d"),
        (&codes.ext, "ext"),
    ]
    .into_iter()
    .map(|(code, suffix)| RatioSpec {
        denominator: code.clone(),
        output: format!("vaccine_spent_share_{suffix}"),
    })
    .collect();
    (per_capita, shares)
}

pub fn run(ctx: &Context<'_>) -> Result<AnalysisOutput> {
    let codes = &ctx.config.financing;

    let mut tev = load_expenditure(ctx, &[TEV])?;
    tev.derive(TEV, |r| r.get(EXPENDITURE).clone());
    let financing = financing_table(ctx)?;
    let population = ctx.population(&codes.population_type, POPULATION)?;

    // One canonical name per code, whatever later partitions call the country.
    let dims = Dimensions::from_table(&tev);
    let joined = join(&tev, &financing, JoinKey::CountryCode, JoinKind::Left);
    let mut table = dims.attach(&join(&joined, &population, JoinKey::CountryCode, JoinKind::Left));

    let (per_capita, shares) = ratio_specs(ctx);
    add_ratios(&mut table, TEV, std::slice::from_ref(&per_capita));
    add_ratios(&mut table, TEV, &shares);
    add_financing_mix(&mut table, &codes.gghe_d, &codes.che, DOMESTIC_SHARE);

    let mut derived: Vec<&str> = vec![per_capita.output.as_str(), DOMESTIC_SHARE];
    derived.extend(shares.iter().map(|s| s.output.as_str()));
    round_columns(&mut table, &derived, ctx.config.precision.derived);

    Classifier::symmetric(ctx.config.thresholds.financing_mix).classify_column(
        &mut table,
        DOMESTIC_SHARE,
        DOMESTIC_SHARE_GROUP,
    );
    info!(
        rows = table.len(),
        countries = table.distinct_text(columns::COUNTRY_CODE).len(),
        "financing ratios"
    );

    let window = ctx.config.windows.financing;
    let plain = ctx.output_options(window, false);
    let percent = ctx.output_options(window, true);

    let mut series = publish(&table, &per_capita.output, &per_capita.output, &BOTH, &plain);
    for spec in &shares {
        series.extend(publish(&table, &spec.output, &spec.output, &BOTH, &percent));
    }
    series.extend(publish(&table, DOMESTIC_SHARE, DOMESTIC_SHARE, &BOTH, &percent));
    series.extend(publish(&table, DOMESTIC_SHARE_GROUP, DOMESTIC_SHARE_GROUP, &[Granularity::Country], &plain));

    Ok(AnalysisOutput {
        series,
        tables: Vec::new(),
    })
}
