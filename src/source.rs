//! Rewindable record sources.
//!
//! The on-disk format read by [`GridFile`] is a plain text archive:
//!
//! ```text
//! # comments run to the end of the line
//! LAT 90 87.5 85
//! LON 0 120 240
//! RECORD 1:2 metre temperature:K:from 198101
//! 250.1 250.3 250.2
//! 251.0 251.4 251.2
//! 252.8 252.6 252.9
//! RECORD 1:2 metre temperature:K:from 198102
//! ...
//! ```
//!
//! `LAT` lists one latitude per grid row and `LON` one longitude per grid
//! column. Every `RECORD` line carries the descriptor and is followed by one
//! line per row.

use std::{io::Write, path::Path};

use logos::Logos;
use miette::Diagnostic;
use ndarray::{Array1, Array2};
use thiserror::Error;

use crate::Record;

/// A sequence of records that can be replayed from the start.
pub trait RecordSource {
    /// Total number of records, known before reading any of them.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Next record in source order, `None` once exhausted.
    fn next_record(&mut self) -> Result<Option<Record>, SourceError>;

    /// Seek back to the first record.
    fn rewind(&mut self) -> Result<(), SourceError>;
}

impl<S: RecordSource + ?Sized> RecordSource for &mut S {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        (**self).next_record()
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        (**self).rewind()
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum SourceError {
    #[error("Could not read {path}: {source}")]
    #[diagnostic(code(poles::source::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Missing `{0}` header")]
    #[diagnostic(
        code(poles::source::header),
        help("a grid file starts with a `LAT` line and a `LON` line")
    )]
    MissingHeader(&'static str),
    #[error("Malformed record {record}: {reason}")]
    #[diagnostic(code(poles::source::malformed))]
    Malformed { record: usize, reason: String },
    #[error("`{0}` header appears twice")]
    #[diagnostic(code(poles::source::header))]
    DuplicateHeader(&'static str),
    #[error("Unexpected input at byte {offset}: `{text}`")]
    #[diagnostic(code(poles::source::token))]
    BadToken { offset: usize, text: String },
    #[error("Could not write grid file: {0}")]
    #[diagnostic(code(poles::source::write))]
    Write(#[from] std::io::Error),
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"([ \t\r]+|#[^\n]*)")]
enum Token {
    #[token("LAT")]
    Latitudes,
    #[token("LON")]
    Longitudes,
    #[regex(r"RECORD[^\n]*")]
    Record,
    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[token("inf", |_| f64::INFINITY)]
    #[token("-inf", |_| f64::NEG_INFINITY)]
    Number(f64),
    #[token("NaN", |_| f64::NAN)]
    Missing(f64),
    #[token("\n")]
    Newline,
}

/// In-memory source, mostly for synthetic data.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Record>,
    cursor: usize,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records, cursor: 0 }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl RecordSource for MemorySource {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        let record = self.records.get(self.cursor).cloned();
        if record.is_some() {
            self.cursor += 1;
        }
        Ok(record)
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.cursor = 0;
        Ok(())
    }
}

/// Text grid archive, see the module documentation for the layout.
///
/// The whole file is kept in memory but grids are only decoded when read.
#[derive(Debug, Clone)]
pub struct GridFile {
    text: String,
    lats: Array1<f64>,
    lons: Array1<f64>,
    // Byte offset of every `RECORD` line
    offsets: Vec<usize>,
    cursor: usize,
}

impl GridFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(text)
    }

    /// Reads the axes and indexes the records of an archive.
    pub fn parse(text: String) -> Result<Self, SourceError> {
        let mut lats = None;
        let mut lons = None;
        let mut offsets = Vec::new();

        let mut lexer = Token::lexer(&text);
        while let Some(token) = lexer.next() {
            let in_records = !offsets.is_empty();
            match token {
                Ok(Token::Latitudes) if lats.is_some() => {
                    return Err(SourceError::DuplicateHeader("LAT"))
                }
                Ok(Token::Longitudes) if lons.is_some() => {
                    return Err(SourceError::DuplicateHeader("LON"))
                }
                Ok(Token::Latitudes) if !in_records => lats = Some(Self::axis(&mut lexer)?),
                Ok(Token::Longitudes) if !in_records => lons = Some(Self::axis(&mut lexer)?),
                Ok(Token::Record) => offsets.push(lexer.span().start),
                Ok(Token::Newline) => (),
                // grid values only belong to a record body
                Ok(Token::Number(_) | Token::Missing(_)) if in_records => (),
                _ => {
                    return Err(SourceError::BadToken {
                        offset: lexer.span().start,
                        text: lexer.slice().to_string(),
                    })
                }
            }
        }

        let lats = lats.ok_or(SourceError::MissingHeader("LAT"))?;
        let lons = lons.ok_or(SourceError::MissingHeader("LON"))?;

        Ok(Self {
            text,
            lats,
            lons,
            offsets,
            cursor: 0,
        })
    }

    pub fn lats(&self) -> &Array1<f64> {
        &self.lats
    }

    pub fn lons(&self) -> &Array1<f64> {
        &self.lons
    }

    fn axis(lexer: &mut logos::Lexer<'_, Token>) -> Result<Array1<f64>, SourceError> {
        let mut values = Vec::new();
        while let Some(token) = lexer.next() {
            match token {
                Ok(Token::Number(value)) => values.push(value),
                Ok(Token::Newline) => break,
                _ => {
                    return Err(SourceError::BadToken {
                        offset: lexer.span().start,
                        text: lexer.slice().to_string(),
                    })
                }
            }
        }
        if values.is_empty() {
            return Err(SourceError::MissingHeader("LAT/LON values"));
        }
        Ok(Array1::from(values))
    }

    fn decode(&self, index: usize) -> Result<Record, SourceError> {
        let malformed = |reason: String| SourceError::Malformed {
            record: index,
            reason,
        };
        let (height, width) = (self.lats.len(), self.lons.len());

        let mut lexer = Token::lexer(&self.text[self.offsets[index]..]);
        let descriptor = match lexer.next() {
            Some(Ok(Token::Record)) => lexer.slice()["RECORD".len()..].trim().to_string(),
            _ => return Err(malformed(String::from("missing RECORD line"))),
        };
        match lexer.next() {
            Some(Ok(Token::Newline)) => (),
            _ => return Err(malformed(String::from("missing newline after descriptor"))),
        }

        let mut values = Vec::with_capacity(height * width);
        let mut row_len = 0;
        let mut rows = 0;
        while rows < height {
            match lexer.next() {
                Some(Ok(Token::Number(value) | Token::Missing(value))) => {
                    values.push(value);
                    row_len += 1;
                }
                // blank line
                Some(Ok(Token::Newline)) if row_len == 0 => (),
                Some(Ok(Token::Newline)) => {
                    if row_len != width {
                        return Err(malformed(format!(
                            "row {rows} has {row_len} values, expected {width}"
                        )));
                    }
                    rows += 1;
                    row_len = 0;
                }
                None if row_len == width => {
                    rows += 1;
                    row_len = 0;
                }
                None => {
                    return Err(malformed(format!(
                        "ends after {rows} rows, expected {height}"
                    )))
                }
                Some(Ok(_)) => {
                    return Err(malformed(format!(
                        "found `{}` after {rows} rows, expected {height}",
                        lexer.slice()
                    )))
                }
                Some(Err(())) => {
                    return Err(malformed(format!("unexpected `{}`", lexer.slice())))
                }
            }
        }

        loop {
            match lexer.next() {
                Some(Ok(Token::Newline)) => (),
                None | Some(Ok(Token::Record)) => break,
                _ => {
                    return Err(malformed(format!(
                        "found `{}` after the last of its {height} rows",
                        lexer.slice()
                    )))
                }
            }
        }

        let data = Array2::from_shape_vec((height, width), values)
            .map_err(|e| malformed(e.to_string()))?;

        Ok(Record {
            descriptor,
            data,
            lats: self.lats.clone(),
            lons: self.lons.clone(),
        })
    }
}

impl RecordSource for GridFile {
    fn len(&self) -> usize {
        self.offsets.len()
    }

    fn next_record(&mut self) -> Result<Option<Record>, SourceError> {
        if self.cursor >= self.offsets.len() {
            return Ok(None);
        }
        let record = self.decode(self.cursor)?;
        self.cursor += 1;
        Ok(Some(record))
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.cursor = 0;
        Ok(())
    }
}

/// Writes `records` as a grid archive readable by [`GridFile`].
///
/// Every record must share the `lats`/`lons` axes.
pub fn write_grid_file<'a, W: Write>(
    mut writer: W,
    lats: &Array1<f64>,
    lons: &Array1<f64>,
    records: impl IntoIterator<Item = (&'a str, &'a Array2<f64>)>,
) -> Result<(), SourceError> {
    write_axis(&mut writer, "LAT", lats)?;
    write_axis(&mut writer, "LON", lons)?;

    for (index, (descriptor, data)) in records.into_iter().enumerate() {
        if data.dim() != (lats.len(), lons.len()) {
            return Err(SourceError::Malformed {
                record: index,
                reason: format!(
                    "grid is {:?}, axes are {:?}",
                    data.dim(),
                    (lats.len(), lons.len())
                ),
            });
        }
        writeln!(writer, "RECORD {descriptor}")?;
        for row in data.rows() {
            let line: Vec<String> = row.iter().map(|value| value.to_string()).collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_axis<W: Write>(writer: &mut W, name: &str, axis: &Array1<f64>) -> std::io::Result<()> {
    write!(writer, "{name}")?;
    for value in axis {
        write!(writer, " {value}")?;
    }
    writeln!(writer)
}
