//! Raw CSV tables and their JSON record view.
//!
//! A [`CsvTable`] keeps every cell as text. Typing happens per column when the
//! table is rendered as JSON records: a column whose present cells all parse
//! as integers (and which has no missing cells) becomes integers, a column
//! whose present cells all parse as numbers becomes floats, anything else
//! stays text. Missing cells render as `null`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::{Map, Number, Value};

use crate::TableError;

/// Cell spellings treated as missing values.
const MISSING_MARKERS: &[&str] = &[
    "", "na", "n/a", "#n/a", "nan", "-nan", "null", "none", "<na>",
];

pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    MISSING_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// Parse a numeric cell, `None` for missing or non-numeric text.
pub fn parse_number(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }
    cell.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Text,
}

/// Header plus string rows, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a CSV file with a header row.
    pub fn read(path: &Path) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(BufReader::new(file));

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| TableError::Malformed {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(str::to_owned)
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(TableError::MissingHeader {
                path: path.to_path_buf(),
            });
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| TableError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
            rows.push(record.iter().map(str::to_owned).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn write(&self, path: &Path) -> Result<(), TableError> {
        let write_error = |source| TableError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::Writer::from_path(path).map_err(write_error)?;
        writer.write_record(&self.headers).map_err(write_error)?;
        for row in &self.rows {
            writer.write_record(row).map_err(write_error)?;
        }
        writer
            .flush()
            .map_err(|err| write_error(csv::Error::from(err)))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Index of a column that must exist.
    pub fn require_column(&self, name: &str, path: &Path) -> Result<usize, TableError> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_owned(),
            })
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }

    fn column_kind(&self, column: usize) -> ColumnKind {
        let mut saw_missing = false;
        let mut all_integer = true;
        let mut all_numeric = true;

        for row in &self.rows {
            let Some(cell) = row.get(column) else {
                saw_missing = true;
                continue;
            };
            if is_missing(cell) {
                saw_missing = true;
                continue;
            }
            let trimmed = cell.trim();
            if trimmed.parse::<i64>().is_err() {
                all_integer = false;
            }
            if trimmed.parse::<f64>().is_err() {
                all_numeric = false;
                break;
            }
        }

        match (all_numeric, all_integer && !saw_missing) {
            (true, true) => ColumnKind::Integer,
            (true, false) => ColumnKind::Float,
            _ => ColumnKind::Text,
        }
    }

    /// Rows as JSON objects keyed by header, values typed per column.
    pub fn to_records(&self) -> Vec<Value> {
        let kinds: Vec<ColumnKind> = (0..self.headers.len())
            .map(|column| self.column_kind(column))
            .collect();

        self.rows
            .iter()
            .map(|row| {
                let mut record = Map::with_capacity(self.headers.len());
                for (column, header) in self.headers.iter().enumerate() {
                    let cell = row.get(column).map(String::as_str).unwrap_or("");
                    record.insert(header.clone(), typed_cell(cell, kinds[column]));
                }
                Value::Object(record)
            })
            .collect()
    }
}

fn typed_cell(cell: &str, kind: ColumnKind) -> Value {
    if is_missing(cell) {
        return Value::Null;
    }
    let trimmed = cell.trim();
    match kind {
        ColumnKind::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
        ColumnKind::Float => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ColumnKind::Text => Value::String(cell.to_owned()),
    }
}

/// Render an optional number for CSV output, empty when missing.
pub fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
