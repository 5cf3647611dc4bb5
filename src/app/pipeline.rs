//! Shared pipeline steps used by every CLI command.
//!
//! Analyses run one after another. Each analysis computes all its outputs
//! before writing any of them; a failure stops the run at that analysis.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::analysis::{self, AnalysisOutput, Context};
use crate::config::PipelineConfig;
use crate::data::{ExtractPlan, XmartClient, extract_partitions};
use crate::error::Result;
use crate::io::export::write_table_csv;
use crate::io::weo::convert_weo_export;
use crate::report::{AnalysisSummary, RunSummary};

/// File the WEO converter writes into the data directory.
pub const WEO_TABLE: &str = "cy_imf_weo.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    VaccineSpend,
    Fiscal,
    Financing,
}

impl Analysis {
    pub const ALL: [Analysis; 3] = [Analysis::VaccineSpend, Analysis::Fiscal, Analysis::Financing];

    pub fn name(self) -> &'static str {
        match self {
            Analysis::VaccineSpend => "vaccine-spend",
            Analysis::Fiscal => "fiscal",
            Analysis::Financing => "financing",
        }
    }

    pub fn compute(self, ctx: &Context<'_>) -> Result<AnalysisOutput> {
        match self {
            Analysis::VaccineSpend => analysis::vaccine_spend::run(ctx),
            Analysis::Fiscal => analysis::fiscal::run(ctx),
            Analysis::Financing => analysis::financing::run(ctx),
        }
    }
}

/// Run `analyses` in order, writing each one's outputs once it has succeeded.
pub fn run_analyses(config: &PipelineConfig, analyses: &[Analysis]) -> Result<RunSummary> {
    let ctx = Context::new(config);
    let mut summary = RunSummary::start();
    for &analysis in analyses {
        info!(analysis = analysis.name(), "running analysis");
        let output = analysis.compute(&ctx)?;
        let files = output.write(&config.data_dir, &config.output_dir)?;
        summary.push(AnalysisSummary::new(analysis.name(), &output, files));
    }
    Ok(summary)
}

/// Pull every configured `(year, table)` from xMart into the data directory.
pub fn run_extract(config: &PipelineConfig) -> Result<usize> {
    let client = XmartClient::from_env(&config.extract.base_url)?;
    let plan = ExtractPlan {
        tables: config.extract.tables.clone(),
        years: config.extract_years(),
        page_size: config.extract.page_size,
    };
    let written = extract_partitions(&client, &plan, &config.data_dir)?;
    info!(written, "extraction finished");
    Ok(written)
}

/// Convert a WEO export and persist it as [`WEO_TABLE`].
pub fn run_weo(config: &PipelineConfig, input: &Path) -> Result<PathBuf> {
    let table = convert_weo_export(input, config.years.weo_first_year)?;
    let path = config.data_dir.join(WEO_TABLE);
    write_table_csv(&path, &table)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::*;

    #[test]
    fn failing_analysis_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        // IA2030 present, population missing.
        write_partition(dir.path(), "MT_AD_IA2030_2020.csv", IA2030_HEADER, &["AAA,Alpha,AFRO,Gavi low income,2020,TEV,1"]);
        let config = config_for(dir.path());
        let err = run_analyses(&config, &[Analysis::VaccineSpend]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn weo_conversion_lands_in_the_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("WEO.tsv");
        std::fs::write(&input, "ISO\tWEO Subject Code\t2023\nAAA\tNGDP_D\t100\n").unwrap();
        let config = config_for(dir.path());
        let path = run_weo(&config, &input).unwrap();
        assert!(path.ends_with(WEO_TABLE));
        let table = crate::io::source::load_source(dir.path(), "cy_imf_weo").unwrap();
        assert_eq!(table.rows()[0].num("NGDP_D"), 100.0);
    }
}
