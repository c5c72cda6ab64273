//! Row source: delimited text decoded into positional rows.

use crate::error::{BatchError, Result};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use log::warn;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One decoded line of a delimited file.
///
/// No schema is attached: pipelines give fields their meaning by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-indexed line the record started on.
    pub line: u64,

    /// Field values in file order.
    pub fields: Vec<String>,
}

impl Row {
    /// Creates a row from its line number and fields.
    pub fn new<S: Into<String>>(line: u64, fields: impl IntoIterator<Item = S>) -> Self {
        Row {
            line,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the field at `index`, if the row has one.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Returns the field at `index` or a `MissingField` error.
    pub fn require(&self, index: usize) -> Result<&str> {
        self.field(index).ok_or(BatchError::MissingField {
            line: self.line,
            index,
            len: self.fields.len(),
        })
    }

    fn from_record(record: &StringRecord) -> Self {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        Row::new(line, record.iter())
    }
}

/// What to do when a line cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Abandon the whole file: no rows are produced, so nothing is mutated.
    #[default]
    FailFast,

    /// Log the bad line and keep reading.
    Skip,
}

/// A lazy, single-pass sequence of rows decoded from delimited text.
///
/// Every line is a record, including the first; header handling belongs to
/// the consumer. Field counts must stay consistent with the first line.
pub struct RowSource<R: Read> {
    records: StringRecordsIntoIter<R>,
}

impl RowSource<BufReader<File>> {
    /// Opens `path` as a row source.
    pub fn open<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BatchError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file), delimiter))
    }
}

impl<R: Read> RowSource<R> {
    /// Wraps any reader as a row source.
    pub fn from_reader(reader: R, delimiter: u8) -> Self {
        let records = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .trim(Trim::None)
            .flexible(false)
            .from_reader(reader)
            .into_records();

        RowSource { records }
    }

    /// Drains the source into memory under the given decode policy.
    ///
    /// Row order is preserved. With `FailFast` the first decode error is
    /// returned and every row read so far is discarded.
    pub fn collect_rows(self, policy: DecodePolicy) -> Result<Vec<Row>> {
        match policy {
            DecodePolicy::FailFast => self.collect(),
            DecodePolicy::Skip => {
                let mut rows = Vec::new();
                for result in self {
                    match result {
                        Ok(row) => rows.push(row),
                        Err(e) => warn!("Skipping undecodable row: {}", e),
                    }
                }
                Ok(rows)
            }
        }
    }
}

impl<R: Read> Iterator for RowSource<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|result| result.map(|record| Row::from_record(&record)).map_err(BatchError::from))
    }
}
