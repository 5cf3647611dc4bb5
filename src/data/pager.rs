//! Lazy `$top`/`$skip` pagination over a [`RecordSource`].
//!
//! [`Pages`] only knows how to produce the next page; [`collect_table`] is the
//! separate step that accumulates pages into a table. A caller can stop
//! iterating at any point, and [`Pages::restart`] rewinds to the first page.

use serde_json::{Map, Value as JsonValue};

use crate::error::{PipelineError, Result};
use crate::table::{Record, Table};

pub type JsonRecord = Map<String, JsonValue>;

/// Outcome of one remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// A page of records; empty means the data is exhausted.
    Page(Vec<JsonRecord>),
    /// Non-success HTTP status.
    Status(u16),
}

/// Anything that can answer `get(path)`.
pub trait RecordSource {
    fn get(&self, path: &str) -> Result<Response>;
}

/// Pages of one `(table, year)` extraction.
pub struct Pages<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    table: String,
    year: i32,
    page_size: usize,
    skip: usize,
    done: bool,
}

impl<'a, S: RecordSource + ?Sized> Pages<'a, S> {
    pub fn new(source: &'a S, table: &str, year: i32, page_size: usize) -> Self {
        Self {
            source,
            table: table.to_string(),
            year,
            page_size: page_size.max(1),
            skip: 0,
            done: false,
        }
    }

    /// Path of the next request.
    pub fn next_path(&self) -> String {
        format!(
            "{}?$top={}&$skip={}&$filter=YEAR in ({})",
            self.table, self.page_size, self.skip, self.year
        )
    }

    pub fn restart(&mut self) {
        self.skip = 0;
        self.done = false;
    }
}

impl<S: RecordSource + ?Sized> Iterator for Pages<'_, S> {
    type Item = Result<Vec<JsonRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let path = self.next_path();
        match self.source.get(&path) {
            Ok(Response::Page(records)) if records.is_empty() => {
                self.done = true;
                None
            }
            Ok(Response::Page(records)) => {
                self.skip += self.page_size;
                Some(Ok(records))
            }
            Ok(Response::Status(status)) => {
                self.done = true;
                Some(Err(PipelineError::RemoteStatus { path, status }))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Drain `pages` into a table. Any failed page fails the whole table.
pub fn collect_table<I>(pages: I) -> Result<Table>
where
    I: IntoIterator<Item = Result<Vec<JsonRecord>>>,
{
    let mut table = Table::new();
    for page in pages {
        for record in page? {
            table.push(flatten_record(&record));
        }
    }
    Ok(table)
}

/// Flatten nested JSON objects into `parent.child` columns.
pub fn flatten_record(record: &JsonRecord) -> Record {
    let mut out = Record::new();
    flatten_into(&mut out, "", record);
    out
}

fn flatten_into(out: &mut Record, prefix: &str, object: &JsonRecord) {
    for (key, value) in object {
        let name = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        match value {
            JsonValue::Object(inner) => flatten_into(out, &name, inner),
            JsonValue::Null => {}
            JsonValue::Bool(b) => out.set(&name, b.to_string()),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => out.set(&name, i),
                None => out.set(&name, n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => out.set(&name, s.as_str()),
            JsonValue::Array(_) => out.set(&name, value.to_string()),
        }
    }
}
