//! Command-line parsing for the `whdh` pipeline.
//!
//! Argument parsing lives here; `app` maps commands onto analyses.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "whdh", version, about = "WHO/IMF immunization financing indicator pipeline")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct GlobalArgs {
    /// TOML configuration file (all keys optional).
    #[arg(short, long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Override the partition directory.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the JSON output directory.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pull source partitions from the xMart API into the data directory.
    Extract,
    /// Convert an IMF WEO export into `cy_imf_weo.csv`.
    Weo(WeoArgs),
    /// Vaccine expenditure per surviving infant.
    VaccineSpend,
    /// Fiscal space index, constant-USD primary expenditure, and zero-dose counts.
    Fiscal,
    /// Immunization financing ratios and domestic share.
    Financing,
    /// Run every analysis in order.
    All,
}

#[derive(Debug, Args, Clone)]
pub struct WeoArgs {
    /// WEO "all countries" export (tab-delimited, UTF-16LE or UTF-8).
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,
}
