//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module parses the
//! CLI, sets up logging, loads configuration, and dispatches commands.

use chrono::Local;
use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Command, GlobalArgs};
use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::logging::init_logging;

pub mod pipeline;

use pipeline::Analysis;

/// Entry point for the `whdh` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);
    let config = load_config(&cli.global)?;

    match cli.command {
        Command::Extract => {
            let written = pipeline::run_extract(&config)?;
            println!("Wrote {written} partitions to {}", config.data_dir.display());
            Ok(())
        }
        Command::Weo(args) => {
            let path = pipeline::run_weo(&config, &args.input)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::VaccineSpend => handle_analyses(&config, &[Analysis::VaccineSpend]),
        Command::Fiscal => handle_analyses(&config, &[Analysis::Fiscal]),
        Command::Financing => handle_analyses(&config, &[Analysis::Financing]),
        Command::All => handle_analyses(&config, &Analysis::ALL),
    }
}

fn handle_analyses(config: &PipelineConfig, analyses: &[Analysis]) -> Result<(), AppError> {
    let summary = pipeline::run_analyses(config, analyses)?;
    println!("{}", crate::report::format_run_summary(&summary, Local::now()));
    Ok(())
}

/// Configuration file (or defaults) with CLI directory overrides applied.
pub fn load_config(args: &GlobalArgs) -> Result<PipelineConfig, AppError> {
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    info!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        "configuration loaded"
    );
    Ok(config)
}
