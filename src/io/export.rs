//! Writers for intermediate tables (CSV) and published series (JSON).
//!
//! Both overwrite their target file.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::domain::Granularity;
use crate::error::{PipelineError, Result};
use crate::table::Table;
use crate::transform::NestedSeries;

/// Write a table as CSV with its column order.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let mut writer = csv::Writer::from_path(path).map_err(|e| PipelineError::csv(path, e))?;
    writer
        .write_record(table.columns())
        .map_err(|e| PipelineError::csv(path, e))?;
    for row in table.rows() {
        let cells: Vec<String> = table.columns().iter().map(|c| row.get(c).to_cell()).collect();
        writer.write_record(&cells).map_err(|e| PipelineError::csv(path, e))?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

/// File name of a published series: `{indicator}_{granularity}.json`.
pub fn series_file_name(indicator: &str, granularity: Granularity) -> String {
    format!("{indicator}_{}.json", granularity.as_str())
}

/// Write a nested series into `dir`, returning the written path.
pub fn write_series_json(
    dir: &Path,
    indicator: &str,
    granularity: Granularity,
    series: &NestedSeries,
) -> Result<PathBuf> {
    create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    let path = dir.join(series_file_name(indicator, granularity));
    let file = File::create(&path).map_err(|e| PipelineError::io(&path, e))?;

    // Downstream consumers diff these files; keep the 4-space layout stable.
    let mut ser = serde_json::Serializer::with_formatter(file, PrettyFormatter::with_indent(b"    "));
    series.serialize(&mut ser)?;
    Ok(path)
}
