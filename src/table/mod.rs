//! In-memory tabular data.
//!
//! A [`Table`] is an ordered list of [`Record`]s plus the ordered union of their
//! column names. Records are sparse: a column absent from a record reads as
//! [`Value::Missing`], which keeps outer joins and concatenation of partitions
//! with drifting schemas cheap.

use std::collections::{BTreeMap, HashSet};

use crate::domain::columns;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i64),
    Number(f64),
    Text(String),
}

impl Value {
    /// Parse a raw cell from a persisted partition.
    ///
    /// Empty strings and non-finite literals are treated as missing.
    pub fn parse(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return Value::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return if v.is_finite() { Value::Number(v) } else { Value::Missing };
        }
        Value::Text(trimmed.to_string())
    }

    /// Numeric view; NaN for missing or textual cells.
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Int(v) => *v as f64,
            Value::Number(v) => *v,
            Value::Missing | Value::Text(_) => f64::NAN,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Render for CSV output. Missing and NaN become empty cells.
    pub fn to_cell(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Int(v) => v.to_string(),
            Value::Number(v) if v.is_finite() => v.to_string(),
            Value::Number(_) => String::new(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_nan() { Value::Missing } else { Value::Number(v) }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: BTreeMap<String, Value>,
}

static MISSING: Value = Value::Missing;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> &Value {
        self.cells.get(column).unwrap_or(&MISSING)
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.cells.insert(column.to_string(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.cells.remove(column)
    }

    pub fn num(&self, column: &str) -> f64 {
        self.get(column).as_f64()
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).as_text()
    }

    /// Year of the observation, accepting integer or integral float cells.
    pub fn year(&self) -> Option<i32> {
        match self.get(columns::YEAR) {
            Value::Int(v) => i32::try_from(*v).ok(),
            Value::Number(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i32),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.cells.iter_mut()
    }
}

/// Ordered rows with a stable column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.push(record);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn push(&mut self, record: Record) {
        for (name, _) in record.iter() {
            self.add_column(name);
        }
        self.rows.push(record);
    }

    pub fn add_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    /// Append every row of `other`, preserving order.
    pub fn extend(&mut self, other: Table) {
        for column in &other.columns {
            self.add_column(column);
        }
        self.rows.extend(other.rows);
    }

    pub fn filter(&self, mut keep: impl FnMut(&Record) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, wanted: &[&str]) -> Table {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut out = Record::new();
                for &column in wanted {
                    if let Some(value) = row.cells.get(column) {
                        out.set(column, value.clone());
                    }
                }
                out
            })
            .collect();
        Table {
            columns: wanted.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Compute (or overwrite) a column from each row.
    pub fn derive(&mut self, column: &str, mut f: impl FnMut(&Record) -> Value) {
        self.add_column(column);
        for row in &mut self.rows {
            let value = f(row);
            row.set(column, value);
        }
    }

    /// Apply `f` to every numeric cell of the named columns.
    pub fn map_numeric(&mut self, targets: &[&str], f: impl Fn(f64) -> f64) {
        for row in &mut self.rows {
            for &column in targets {
                let v = row.num(column);
                if matches!(row.get(column), Value::Number(_) | Value::Int(_)) {
                    row.set(column, Value::from(f(v)));
                }
            }
        }
    }

    /// Stable sort by the given text/numeric key columns, then by year.
    pub fn sort_by_keys_then_year(&mut self, keys: &[&str]) {
        self.rows.sort_by(|a, b| {
            for &key in keys {
                let ord = compare_cells(a.get(key), b.get(key));
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            a.year().cmp(&b.year())
        });
    }

    pub fn rows_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }

    /// Distinct text values of a column in first-seen order.
    pub fn distinct_text(&self, column: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if let Some(s) = row.text(column) {
                if seen.insert(s.to_string()) {
                    out.push(s.to_string());
                }
            }
        }
        out
    }
}

fn compare_cells(a: &Value, b: &Value) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Missing, Value::Missing) => Ordering::Equal,
        (Value::Missing, _) => Ordering::Greater,
        (_, Value::Missing) => Ordering::Less,
        _ => a.as_f64().total_cmp(&b.as_f64()),
    }
}
