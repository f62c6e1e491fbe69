//! The salary dataset: loading, columnar storage and record access.
//!
//! A [`Dataset`] owns the raw CSV bytes (memory-mapped or in memory) and keeps
//! numeric fields as typed vectors and text fields as byte spans into that buffer.
//! It is immutable once built; the filter and aggregation engines only borrow it.

use std::fmt;
use std::io::{self, Write};
use std::ops::Deref;

use memmap2::Mmap;
use serde::Serialize;
use thiserror::Error;

pub mod column;
mod loader;
pub mod schema;

use column::Column;
pub use schema::{ColumnType, Field};

/// Errors raised while building a [`Dataset`]. All of them are startup-fatal.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("missing header line")]
    MissingHeader,

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("missing column: {0}")]
    MissingColumn(Field),

    #[error("{count} malformed row(s), first at {first}")]
    MalformedRows { count: usize, first: ParseError },

    #[error("cannot write {field} value {value:?} as CSV: quotes and line breaks are not supported")]
    UnwritableValue { field: Field, value: String },
}

/// A row that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number in the file, header included
    pub line: usize,
    /// Offending column, empty when the whole line is at fault
    pub column: String,
    pub value: String,
    pub error: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column.is_empty() {
            write!(f, "line {}: {}", self.line, self.error)
        } else {
            write!(
                f,
                "line {}, column '{}': {} (value: {:?})",
                self.line, self.column, self.error, self.value
            )
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub rows_processed: usize,
    pub errors: Vec<ParseError>,
}

impl ParseSummary {
    pub fn rows_skipped(&self) -> usize {
        self.errors.len()
    }
}

/// How strictly malformed rows are treated while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Fail on the first malformed row instead of skipping it
    pub strict: bool,
}

impl LoadOptions {
    pub fn lenient() -> Self {
        LoadOptions { strict: false }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { strict: true }
    }
}

/// An owned salary record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub work_year: i64,
    pub experience_level: String,
    pub employment_type: String,
    pub job_title: String,
    pub salary_in_usd: f64,
    pub remote_ratio: String,
    pub company_size: String,
    pub employee_country: String,
}

/// A record borrowed from a [`Dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordRef<'a> {
    pub work_year: i64,
    pub experience_level: &'a str,
    pub employment_type: &'a str,
    pub job_title: &'a str,
    pub salary_in_usd: f64,
    pub remote_ratio: &'a str,
    pub company_size: &'a str,
    pub employee_country: &'a str,
}

impl RecordRef<'_> {
    pub fn to_record(&self) -> Record {
        Record {
            work_year: self.work_year,
            experience_level: self.experience_level.to_string(),
            employment_type: self.employment_type.to_string(),
            job_title: self.job_title.to_string(),
            salary_in_usd: self.salary_in_usd,
            remote_ratio: self.remote_ratio.to_string(),
            company_size: self.company_size.to_string(),
            employee_country: self.employee_country.to_string(),
        }
    }
}

#[derive(Debug)]
enum Buffer {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Buffer::Mapped(mmap) => &mmap[..],
            Buffer::Owned(bytes) => &bytes[..],
        }
    }
}

/// The loaded salary dataset.
#[derive(Debug)]
pub struct Dataset {
    buffer: Buffer,       // owns the CSV bytes
    columns: Vec<Column>, // indexed by `Field::index`
    row_count: usize,
    headers: Vec<String>,
    summary: ParseSummary,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Header row of the source file, including columns the dataset ignores.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn parse_summary(&self) -> &ParseSummary {
        &self.summary
    }

    pub fn column(&self, field: Field) -> &Column {
        &self.columns[field.index()]
    }

    pub fn work_years(&self) -> &[i64] {
        self.column(Field::WorkYear).as_i64()
    }

    pub fn salaries(&self) -> &[f64] {
        self.column(Field::SalaryInUsd).as_f64()
    }

    /// Text value of `field` at `row`. Numeric fields and out-of-range rows yield "".
    pub fn text(&self, field: Field, row: usize) -> &str {
        self.column(field)
            .as_spans()
            .get(row)
            .map(|&(start, end)| self.get_string(start, end))
            .unwrap_or("")
    }

    // Text spans were validated as UTF-8 while parsing
    fn get_string(&self, start: usize, end: usize) -> &str {
        self.buffer
            .get(start..end)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .unwrap_or("")
    }

    /// Borrowed view of one row.
    ///
    /// # Panics
    /// If `row >= self.len()`.
    pub fn record(&self, row: usize) -> RecordRef<'_> {
        RecordRef {
            work_year: self.work_years()[row],
            experience_level: self.text(Field::ExperienceLevel, row),
            employment_type: self.text(Field::EmploymentType, row),
            job_title: self.text(Field::JobTitle, row),
            salary_in_usd: self.salaries()[row],
            remote_ratio: self.text(Field::RemoteRatio, row),
            company_size: self.text(Field::CompanySize, row),
            employee_country: self.text(Field::EmployeeCountry, row),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = RecordRef<'_>> + '_ {
        (0..self.row_count).map(move |row| self.record(row))
    }
}

/// Writes records as CSV with a header row covering every [`Field`].
///
/// Text containing a comma is quoted. Text containing a double quote or a line
/// break cannot be read back by the loader and is rejected with
/// [`DatasetError::UnwritableValue`] before anything is written for that record.
pub fn write_csv<W: Write>(mut writer: W, records: &[Record]) -> Result<(), DatasetError> {
    let header: Vec<&str> = Field::ALL.iter().map(|f| f.column_name()).collect();
    writeln!(writer, "{}", header.join(","))?;

    for r in records {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            r.work_year,
            csv_text(Field::ExperienceLevel, &r.experience_level)?,
            csv_text(Field::EmploymentType, &r.employment_type)?,
            csv_text(Field::JobTitle, &r.job_title)?,
            r.salary_in_usd,
            csv_text(Field::RemoteRatio, &r.remote_ratio)?,
            csv_text(Field::CompanySize, &r.company_size)?,
            csv_text(Field::EmployeeCountry, &r.employee_country)?,
        )?;
    }
    Ok(())
}

fn csv_text(field: Field, value: &str) -> Result<std::borrow::Cow<'_, str>, DatasetError> {
    if value.contains(['"', '\n', '\r']) {
        return Err(DatasetError::UnwritableValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(if value.contains(',') {
        format!("\"{value}\"").into()
    } else {
        value.into()
    })
}
