//! Input/output helpers.
//!
//! - CSV partition discovery and ingest (`source`)
//! - CSV table and JSON series writers (`export`)
//! - IMF WEO export conversion (`weo`)

pub mod export;
pub mod source;
pub mod weo;

pub use export::{series_file_name, write_series_json, write_table_csv};
pub use source::{discover_partitions, load_source, read_table_csv};
pub use weo::convert_weo_export;
