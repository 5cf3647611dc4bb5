//! `whdh-gold` library crate.
//!
//! The binary (`whdh`) is a thin wrapper around this library so that:
//!
//! - every analysis is testable without spawning processes
//! - the table and transform layers can be reused outside the CLI

pub mod analysis;
pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod report;
pub mod table;
pub mod transform;
