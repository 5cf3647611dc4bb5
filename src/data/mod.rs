//! Remote data acquisition.

pub mod pager;
pub mod xmart;

pub use pager::{Pages, RecordSource, Response, collect_table};
pub use xmart::{ExtractPlan, XmartClient, extract_partitions};
