//! Delimiter-separated text codec shared by every export and import job.
//!
//! Built on the `csv` crate with a forgiving reader: quoted fields may span
//! lines, blank lines vanish, short rows are padded and an unterminated quote
//! runs to the end of the input. There is no I/O here; callers read and write
//! files themselves.

use std::collections::BTreeMap;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};

/// One parsed record keyed by header name.
pub type Row = BTreeMap<String, String>;

pub const CSV: u8 = b',';
pub const TSV: u8 = b'\t';

const BOM: char = '\u{feff}';

#[derive(Debug, thiserror::Error)]
pub enum TabularError {
    #[error("failed to encode delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("encoded text is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Parse comma-separated text whose first record is the header.
#[must_use]
pub fn parse(text: &str) -> Vec<Row> {
    parse_delimited(text, CSV).1
}

/// Parse delimited text, returning the header alongside the keyed rows.
///
/// Fields beyond the header width are ignored; missing fields become `""`.
#[must_use]
pub fn parse_delimited(text: &str, delimiter: u8) -> (Vec<String>, Vec<Row>) {
    let mut records = parse_records(text, delimiter).into_iter();
    let Some(header) = records.next() else {
        return (Vec::new(), Vec::new());
    };
    let header: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    let rows = records
        .map(|record| {
            header
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), record.get(i).cloned().unwrap_or_default()))
                .collect::<Row>()
        })
        .collect();

    (header, rows)
}

/// Split delimited text into raw records, header included.
///
/// Records of any width are accepted. Empty lines are skipped and a record
/// the reader cannot decode is dropped.
#[must_use]
pub fn parse_records(text: &str, delimiter: u8) -> Vec<Vec<String>> {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    reader
        .records()
        .filter_map(|result| match result {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(error = %e, "skipping undecodable record");
                None
            }
        })
        .filter(|record| !record.is_empty())
        .map(|record: StringRecord| record.iter().map(str::to_string).collect())
        .collect()
}

/// Serialize rows as comma-separated text under `header`.
///
/// # Errors
///
/// Returns [`TabularError`] if the writer rejects a record.
pub fn serialize(rows: &[Row], header: &[&str]) -> Result<String, TabularError> {
    serialize_delimited(rows, header, CSV)
}

/// Serialize rows under `header`, quoting only the fields that need it.
///
/// Values missing from a row are written as empty fields.
///
/// # Errors
///
/// Returns [`TabularError`] if the writer rejects a record.
pub fn serialize_delimited(
    rows: &[Row],
    header: &[&str],
    delimiter: u8,
) -> Result<String, TabularError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(
            header
                .iter()
                .map(|name| row.get(*name).map_or("", String::as_str)),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| TabularError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8(bytes)?)
}
