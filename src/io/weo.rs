//! IMF World Economic Outlook export conversion.
//!
//! The WEO "all countries" download is a tab-separated sheet (usually UTF-16LE)
//! with one row per `(country, subject)` and one column per year. This module
//! turns it into the wide `cy_imf_weo` table: one row per
//! `(country_code, year)`, one column per WEO subject code.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8, UTF_16LE};
use tracing::info;

use crate::domain::columns;
use crate::error::{PipelineError, Result};
use crate::io::source::read_table_from;
use crate::table::{Record, Table, Value};
use crate::transform::join::{JoinKey, pivot_mean};

const ISO: &str = "ISO";
const SUBJECT: &str = "WEO Subject Code";
const SUBJECT_COLUMN: &str = "weo_subject_code";

/// Convert a WEO export file, keeping years from `first_year` onwards.
pub fn convert_weo_export(path: &Path, first_year: i32) -> Result<Table> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    let text = decode_text(&bytes);
    let raw = read_table_from(text.as_bytes(), b'\t', path)?;

    for required in [ISO, SUBJECT] {
        if !raw.has_column(required) {
            return Err(PipelineError::MissingColumn {
                source_name: path.display().to_string(),
                column: required.to_string(),
            });
        }
    }

    let year_columns: Vec<(i32, &str)> = raw
        .columns()
        .iter()
        .filter_map(|c| c.parse::<i32>().ok().map(|y| (y, c.as_str())))
        .filter(|&(y, _)| y >= first_year)
        .collect();

    // Melt to long observations.
    let mut long = Table::new();
    for row in raw.rows() {
        let Some(code) = cell_text(row.get(ISO)) else {
            continue;
        };
        let Some(subject) = cell_text(row.get(SUBJECT)) else {
            continue;
        };
        for &(year, column) in &year_columns {
            long.push(
                Record::new()
                    .with(columns::COUNTRY_CODE, code.as_str())
                    .with(SUBJECT_COLUMN, subject.as_str())
                    .with(columns::YEAR, i64::from(year))
                    .with(columns::VALUE, parse_weo_number(row.get(column))),
            );
        }
    }

    let mut wide = pivot_mean(&long, JoinKey::CountryCode, SUBJECT_COLUMN, columns::VALUE);
    wide.sort_by_keys_then_year(&[columns::COUNTRY_CODE]);
    info!(
        path = %path.display(),
        countries = wide.distinct_text(columns::COUNTRY_CODE).len(),
        rows = wide.len(),
        "converted WEO export"
    );
    Ok(wide)
}

/// Decode UTF-16LE (with or without BOM) or UTF-8 text.
fn decode_text(bytes: &[u8]) -> String {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        // BOM-less exports still start with an ASCII header cell.
        None if bytes.len() >= 2 && bytes[0] != 0 && bytes[1] == 0 => UTF_16LE,
        None => UTF_8,
    };
    let (text, _) = encoding.decode_with_bom_removal(bytes);
    text.into_owned()
}

/// ISO codes and subject codes may be parsed as numbers by the generic cell
/// parser; read them back as text.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Missing => None,
        Value::Text(s) => Some(s.clone()),
        other => Some(other.to_cell()),
    }
}

/// WEO numeric cells: `n/a`/`NA`/empty are missing, `--` is zero, thousands
/// separators are stripped.
fn parse_weo_number(value: &Value) -> f64 {
    match value {
        Value::Int(_) | Value::Number(_) => value.as_f64(),
        Value::Missing => f64::NAN,
        Value::Text(s) => match s.trim() {
            "n/a" | "NA" | "" => f64::NAN,
            "--" => 0.0,
            other => other.replace(',', "").parse::<f64>().unwrap_or(f64::NAN),
        },
    }
}
