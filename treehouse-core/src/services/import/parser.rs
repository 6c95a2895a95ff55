//! CSV parsing into header-keyed rows

use serde_json::{Map, Value};

use crate::domain::result::{Error, Result};

/// A parsed CSV file: header columns plus body rows
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub columns: Vec<String>,
    pub rows: Vec<CsvRow>,
}

/// One body row as `(header, value)` pairs in column order
///
/// Cells missing from a short row are absent from `fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    /// 0-based position among the body rows
    pub index: usize,
    pub fields: Vec<(String, String)>,
}

impl CsvRow {
    /// Line number as users see it (header is line 1)
    pub fn number(&self) -> usize {
        self.index + 2
    }

    /// Trimmed value, `None` when absent or blank
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Cells as a JSON object, keys in column order
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

/// Parse CSV text; the first line is the header
///
/// Quoting is checked before tokenizing: the reader would otherwise fold
/// everything after an unterminated quote into a single cell.
pub fn parse_csv(text: &str) -> Result<ParsedCsv> {
    let text = text.trim_start_matches('\u{feff}');
    check_quoting(text)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| Error::parse(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    if columns.iter().all(|c| c.is_empty()) {
        return Err(Error::parse("missing header row"));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::parse(e.to_string()))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        // Extra cells beyond the header are dropped by the zip
        let fields = columns
            .iter()
            .zip(record.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();

        rows.push(CsvRow {
            index: rows.len(),
            fields,
        });
    }

    Ok(ParsedCsv { columns, rows })
}

#[derive(Clone, Copy)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted { opened_on: usize },
    /// A quote inside a quoted field: either an escape or the closing quote
    QuoteInQuoted { opened_on: usize },
    AfterClosingQuote,
}

/// Reject unterminated quoted fields and quotes inside unquoted fields
fn check_quoting(text: &str) -> Result<()> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1;

    for c in text.chars() {
        state = match (state, c) {
            (QuoteState::FieldStart, '"') => QuoteState::Quoted { opened_on: line },
            (QuoteState::FieldStart | QuoteState::Unquoted, ',' | '\n') => QuoteState::FieldStart,
            (QuoteState::FieldStart | QuoteState::Unquoted, '"') => {
                return Err(Error::parse(format!(
                    "unexpected quote in unquoted field on line {}",
                    line
                )));
            }
            (QuoteState::FieldStart | QuoteState::Unquoted, _) => QuoteState::Unquoted,
            (QuoteState::Quoted { opened_on }, '"') => QuoteState::QuoteInQuoted { opened_on },
            (QuoteState::Quoted { .. }, _) => state,
            (QuoteState::QuoteInQuoted { opened_on }, '"') => QuoteState::Quoted { opened_on },
            (QuoteState::QuoteInQuoted { .. } | QuoteState::AfterClosingQuote, ',' | '\n') => {
                QuoteState::FieldStart
            }
            (QuoteState::QuoteInQuoted { .. } | QuoteState::AfterClosingQuote, ' ' | '\t' | '\r') => {
                QuoteState::AfterClosingQuote
            }
            (QuoteState::QuoteInQuoted { .. } | QuoteState::AfterClosingQuote, _) => {
                return Err(Error::parse(format!(
                    "unexpected character after closing quote on line {}",
                    line
                )));
            }
        };
        if c == '\n' {
            line += 1;
        }
    }

    match state {
        QuoteState::Quoted { opened_on } => Err(Error::parse(format!(
            "unterminated quoted field starting on line {}",
            opened_on
        ))),
        _ => Ok(()),
    }
}
