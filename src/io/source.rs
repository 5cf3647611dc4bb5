//! Partition discovery and CSV table ingest.
//!
//! Every source is persisted as one CSV file per `(source, year)` partition,
//! named `{SOURCE}_{year}.csv`. Loading a source means finding every partition
//! whose file name starts with the source prefix and concatenating them.
//!
//! Policy:
//! - partitions are read in ascending file-name order, so "first occurrence"
//!   is reproducible across runs
//! - zero matching partitions is an error, never an empty table
//! - no deduplication happens here

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::table::{Record, Table, Value};

/// Load and concatenate all partitions of `prefix` under `dir`.
pub fn load_source(dir: &Path, prefix: &str) -> Result<Table> {
    let partitions = discover_partitions(dir, prefix)?;
    if partitions.is_empty() {
        return Err(PipelineError::SourceNotFound {
            prefix: prefix.to_string(),
            dir: dir.to_path_buf(),
        });
    }

    let mut table = Table::new();
    for path in &partitions {
        let part = read_table_csv(path)?;
        debug!(path = %path.display(), rows = part.len(), "read partition");
        table.extend(part);
    }
    info!(source = prefix, partitions = partitions.len(), rows = table.len(), "loaded source");
    Ok(table)
}

/// CSV partitions under `dir` whose file name starts with `prefix`, sorted.
pub fn discover_partitions(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut out = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_csv = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && name.starts_with(prefix) && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Read a single CSV file into a table, inferring cell types.
pub fn read_table_csv(path: &Path) -> Result<Table> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    read_table_from(file, b',', path)
}

pub(crate) fn read_table_from(reader: impl std::io::Read, delimiter: u8, path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let mut table = Table::new();
    for column in &headers {
        table.add_column(column);
    }
    for result in reader.records() {
        let record = result.map_err(|e| PipelineError::csv(path, e))?;
        let mut row = Record::new();
        for (name, raw) in headers.iter().zip(record.iter()) {
            let value = Value::parse(raw);
            if !matches!(value, Value::Missing) {
                row.set(name, value);
            }
        }
        table.push(row);
    }
    Ok(table)
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}
