//! Time-indexed numeric table backed by CSV
//!
//! Both the price table and the spread table share this layout: a `time`
//! column followed by one column per series. Empty or `NaN` cells are read
//! as missing values and written back as empty fields.

use crate::{PairsTradingError, Result};
use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, Writer};
use indexmap::IndexMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Name of the time column
pub const TIME_COLUMN: &str = "time";

/// Format used when writing timestamps
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rows of optional values sharing one ascending time index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeTable {
    times: Vec<DateTime<Utc>>,
    columns: IndexMap<String, Vec<Option<f64>>>,
}

impl TimeTable {
    /// Create an empty table over the given time index
    pub fn new(times: Vec<DateTime<Utc>>) -> Self {
        Self {
            times,
            columns: IndexMap::new(),
        }
    }

    /// Add or replace a column. Its length must match the time index.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<()> {
        let name = name.into();
        if values.len() != self.times.len() {
            return Err(PairsTradingError::DataParsing(format!(
                "Column {} has {} rows, table has {}",
                name,
                values.len(),
                self.times.len()
            ))
            .into());
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Time index
    pub fn times(&self) -> &[DateTime<Utc>] {
        &self.times
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Values of a column
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Whether a column exists
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in table order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Value of a column in the last row
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.column(name).and_then(|values| values.last().copied().flatten())
    }

    /// Read a table from a CSV file
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path).with_context(|| format!("Failed to open file: {:?}", path.as_ref()))?;
        Self::from_reader(file).with_context(|| format!("Failed to parse table: {:?}", path.as_ref()))
    }

    /// Write the table to a CSV file
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(&path).with_context(|| format!("Failed to create file: {:?}", path.as_ref()))?;
        self.to_writer(file)
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers = reader.headers()?.clone();
        let time_idx = headers
            .iter()
            .position(|h| h == TIME_COLUMN)
            .ok_or_else(|| PairsTradingError::DataParsing(format!("Missing '{}' column", TIME_COLUMN)))?;

        let names: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, name)| *idx != time_idx && !name.is_empty())
            .map(|(idx, name)| (idx, name.to_string()))
            .collect();

        let mut rows: Vec<(DateTime<Utc>, Vec<Option<f64>>)> = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let time = parse_time(record.get(time_idx).unwrap_or_default())
                .with_context(|| format!("Row {}", line + 1))?;
            let values = names
                .iter()
                .map(|(idx, name)| {
                    parse_cell(record.get(*idx).unwrap_or_default())
                        .with_context(|| format!("Row {}, column {}", line + 1, name))
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push((time, values));
        }

        rows.sort_by_key(|(time, _)| *time);

        let mut table = Self::new(rows.iter().map(|(time, _)| *time).collect());
        for (col, (_, name)) in names.into_iter().enumerate() {
            let values = rows.iter().map(|(_, values)| values[col]).collect();
            table.insert_column(name, values)?;
        }
        Ok(table)
    }

    /// Write CSV to any writer
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = Writer::from_writer(writer);

        let mut header = vec![TIME_COLUMN.to_string()];
        header.extend(self.columns.keys().cloned());
        writer.write_record(&header)?;

        for (row, time) in self.times.iter().enumerate() {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(time.format(TIME_FORMAT).to_string());
            for values in self.columns.values() {
                record.push(values[row].map(|v| v.to_string()).unwrap_or_default());
            }
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Accepts `%Y-%m-%d %H:%M:%S` (optionally with fractional seconds),
/// RFC 3339 or epoch milliseconds
pub fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(millis) = raw.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp_millis(millis) {
            return Ok(dt);
        }
    }
    Err(PairsTradingError::DataParsing(format!("Invalid timestamp '{}'", raw)).into())
}

fn parse_cell(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|e| PairsTradingError::DataParsing(format!("Invalid number '{}': {}", raw, e)))?;
    Ok(if value.is_finite() { Some(value) } else { None })
}
