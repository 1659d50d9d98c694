//! Backup import: JSON backups and CSV exports back into records.
//!
//! CSV files come in two layouts. Files written by this tool are comma
//! separated with RFC 4180 quoting. Files re-saved by a spreadsheet arrive
//! tab separated, where the empty "extended body" cell of one row runs into
//! the identifier of the next; those are grouped four tokens at a time and
//! the identifier is cleaned up.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::settings::BACKUP_EXTENSION;
use crate::domain::{AppError, ExportEncoding, FormatConfig, LogRecord, RecordStore, Result};

use super::codec::{from_backup_json, EXPORT_HEADER};
use super::tags::normalize_tag;

/// Tokens per record in the tab-separated layout.
pub const CSV_GROUP_SIZE: usize = 4;

const EXPORT_HEADER_CRLF: &str = "identifier,category,date,body,extended body\r\n";

/// Bytes of a stray UTF-8 byte-order mark left in the first identifier.
const BOM_BYTES: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Import source kind, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// JSON backup (`.letslog`).
    Backup,
    /// CSV export (`.csv`); needs an encoding.
    Csv,
}

impl ImportKind {
    /// Dispatches on the file extension.
    ///
    /// # Errors
    /// Returns `AppError::Read` for any other extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some(BACKUP_EXTENSION) => Ok(Self::Backup),
            Some("csv") => Ok(Self::Csv),
            _ => Err(AppError::read(format!(
                "unsupported file type: {}",
                path.display()
            ))),
        }
    }
}

/// Decodes raw CSV bytes with the encoding the user picked.
///
/// # Errors
/// Returns `AppError::Read` when the bytes are not valid in that encoding,
/// which usually means the wrong encoding was selected.
pub fn decode_text(bytes: &[u8], encoding: ExportEncoding) -> Result<String> {
    let (text, had_errors) = encoding.encoding().decode_with_bom_removal(bytes);
    if had_errors {
        return Err(AppError::read(format!(
            "file is not valid {}",
            encoding.select_title()
        )));
    }
    Ok(text.into_owned())
}

/// Decodes a JSON backup.
///
/// # Errors
/// Returns `AppError::Decode` if the bytes are not a record array.
pub fn parse_json_backup(bytes: &[u8]) -> Result<Vec<LogRecord>> {
    from_backup_json(bytes)
}

/// Rebuilds records from CSV export text.
///
/// Malformed rows never fail the batch: a bad identifier gets a fresh UUID,
/// a bad date becomes the current time, and incomplete trailing rows are
/// dropped.
pub fn parse_csv_backup(text: &str, format: &FormatConfig) -> Vec<LogRecord> {
    let body = strip_header(text);

    let rows = match detect_delimiter(body) {
        Delimiter::Tab => tab_rows(body),
        Delimiter::Comma => comma_rows(body),
    };

    tracing::debug!("Parsed {} CSV rows", rows.len());

    rows.into_iter()
        .map(|row| row.into_record(format))
        .collect()
}

/// Reads an import file, dispatching on its extension.
///
/// `encoding` is required for CSV files and ignored for backups.
///
/// # Errors
/// Returns `AppError::Read` if the file cannot be opened or decoded, or
/// yields no records.
pub fn read_import_file(
    path: &Path,
    encoding: Option<ExportEncoding>,
    format: &FormatConfig,
) -> Result<Vec<LogRecord>> {
    let kind = ImportKind::from_path(path)?;
    let bytes = fs::read(path)
        .map_err(|e| AppError::read_with(format!("cannot open {}", path.display()), e))?;

    let records = match kind {
        ImportKind::Backup => parse_json_backup(&bytes)
            .map_err(|e| AppError::read_with("backup is not a list of logs", e))?,
        ImportKind::Csv => {
            let encoding = encoding
                .ok_or_else(|| AppError::read("an encoding must be chosen for CSV files"))?;
            parse_csv_backup(&decode_text(&bytes, encoding)?, format)
        }
    };

    if records.is_empty() {
        return Err(AppError::read(format!(
            "no logs found in {}",
            path.display()
        )));
    }

    tracing::info!(path = %path.display(), count = records.len(), "Read import file");
    Ok(records)
}

/// Hands parsed records to the store.
///
/// # Errors
/// Propagates store failures.
pub fn import_records<S: RecordStore + ?Sized>(
    store: &mut S,
    records: &[LogRecord],
) -> Result<usize> {
    let written = store.upsert_records(records)?;
    tracing::info!(count = written, "Imported logs");
    Ok(written)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Tab,
    Comma,
}

/// The identifier column never contains either delimiter, so the first one
/// seen decides the layout.
fn detect_delimiter(body: &str) -> Delimiter {
    match body.chars().find(|c| *c == '\t' || *c == ',') {
        Some(',') => Delimiter::Comma,
        _ => Delimiter::Tab,
    }
}

fn strip_header(text: &str) -> &str {
    let text = text.trim_start_matches('\u{FEFF}');
    text.strip_prefix(EXPORT_HEADER_CRLF)
        .or_else(|| text.strip_prefix(EXPORT_HEADER))
        .unwrap_or(text)
}

/// One row's raw cells.
#[derive(Debug, Default)]
struct CsvRow {
    id: String,
    tags: String,
    date: String,
    text: String,
}

impl CsvRow {
    fn into_record(self, format: &FormatConfig) -> LogRecord {
        let id = parse_record_id(&self.id);
        let tags = parse_tag_cell(&self.tags);
        let created_at = format.parse_export_timestamp(&self.date).unwrap_or_else(|| {
            tracing::warn!(date = %self.date, "Unparseable date, using current time");
            Utc::now()
        });

        LogRecord::new(self.text, created_at, format)
            .with_id(id)
            .with_tags(tags)
            .with_create_day(self.date)
    }
}

fn tab_rows(body: &str) -> Vec<CsvRow> {
    let tokens: Vec<&str> = body.split('\t').collect();

    tokens
        .chunks_exact(CSV_GROUP_SIZE)
        .map(|group| CsvRow {
            id: group[0].to_string(),
            tags: group[1].to_string(),
            date: group[2].to_string(),
            text: group[3].replace('"', ""),
        })
        .collect()
}

fn comma_rows(body: &str) -> Vec<CsvRow> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Stopped reading CSV at row {}: {}", index + 1, e);
                break;
            }
        };

        if record.len() < CSV_GROUP_SIZE {
            tracing::debug!("Skipping CSV row {} with {} fields", index + 1, record.len());
            continue;
        }

        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        rows.push(CsvRow {
            id: field(0),
            tags: field(1),
            date: field(2),
            text: field(3) + record.get(4).unwrap_or_default(),
        });
    }

    rows
}

/// Cleans a raw identifier cell and parses it, generating a new id on failure.
fn parse_record_id(raw: &str) -> Uuid {
    let cleaned = sanitize_identifier(raw);
    Uuid::parse_str(&cleaned).unwrap_or_else(|_| {
        tracing::warn!(identifier = %raw.escape_debug(), "Invalid identifier, assigning a new one");
        Uuid::new_v4()
    })
}

fn sanitize_identifier(raw: &str) -> String {
    let cleaned = raw.replace("\"\"\r\n", "").replace("\"\"\n", "");
    let mut bytes = cleaned.trim().trim_matches('"').as_bytes().to_vec();

    for target in BOM_BYTES {
        if let Some(index) = bytes.iter().position(|b| *b == target) {
            bytes.remove(index);
        }
    }

    String::from_utf8(bytes)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn parse_tag_cell(cell: &str) -> BTreeSet<String> {
    if cell.is_empty() {
        return BTreeSet::new();
    }

    cell.split(|c| c == '\n' || c == '\r')
        .filter_map(|segment| normalize_tag(&segment.replace('"', "")))
        .collect()
}
