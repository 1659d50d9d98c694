//! Journal service: the use cases behind every command.
//!
//! Owns the record store and the date formatting settings so that display
//! strings are computed the same way for new, edited and imported records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::domain::{
    AppConfig, AppError, ExportEncoding, FormatConfig, JournalStats, LogRecord, Result, TagInfo,
};
use crate::infrastructure::{write_backup, write_export, LocalStorage};

use super::codec::{build_export_text, to_backup_json};
use super::importer::{import_records, read_import_file};
use super::tags::{extract_tags, normalize_tag};

/// Result of an export or backup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// A file was written.
    Written { path: PathBuf, count: usize },
    /// There was nothing to write; no file was touched.
    NoRecords,
}

/// A `[from, to)` creation-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Whole local days from `from` through `to`, both `YYYY-MM-DD`.
    ///
    /// # Errors
    /// Returns `AppError::InvalidData` for unparseable dates or `to` before `from`.
    pub fn from_days(from: &str, to: &str, format: &FormatConfig) -> Result<Self> {
        let parse = |value: &str| {
            format
                .parse_day_start(value)
                .ok_or_else(|| AppError::invalid(format!("Invalid date '{value}', use YYYY-MM-DD")))
        };

        let from = parse(from)?;
        let to = parse(to)? + Duration::days(1);
        if to <= from {
            return Err(AppError::invalid("End date is before start date"));
        }

        Ok(Self { from, to })
    }
}

/// Service for reading and writing the journal.
pub struct JournalService {
    storage: LocalStorage,
    format: FormatConfig,
}

impl JournalService {
    /// Open the store configured in `config`.
    ///
    /// # Errors
    /// Returns error if local storage cannot be opened.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let storage = LocalStorage::open(&config.storage_db_path())?;
        Ok(Self::with_storage(storage, config.format_config()))
    }

    /// Create with an existing storage instance.
    #[must_use]
    pub const fn with_storage(storage: LocalStorage, format: FormatConfig) -> Self {
        Self { storage, format }
    }

    #[must_use]
    pub const fn format(&self) -> &FormatConfig {
        &self.format
    }

    /// Save a new log; tags come from the text.
    ///
    /// # Errors
    /// Returns error if the record cannot be stored.
    pub fn add(&mut self, text: &str, created_at: Option<DateTime<Utc>>) -> Result<LogRecord> {
        let created_at = created_at.unwrap_or_else(Utc::now);
        let record =
            LogRecord::new(text, created_at, &self.format).with_tags(extract_tags(text));

        self.storage.save(&record)?;
        tracing::info!(id = %record.id, tags = record.tags.len(), "Added log");
        Ok(record)
    }

    /// Replace a log's text, re-extracting its tags.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` for an unknown id.
    pub fn edit(&mut self, id: &str, text: &str) -> Result<LogRecord> {
        let current = self.storage.find(id)?;
        let updated = current.update_text(text, extract_tags(text), Utc::now());

        self.storage.save(&updated)?;
        tracing::info!(id = %updated.id, "Edited log");
        Ok(updated)
    }

    /// Move a log to another creation time.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` for an unknown id.
    pub fn redate(&mut self, id: &str, created_at: DateTime<Utc>) -> Result<LogRecord> {
        let current = self.storage.find(id)?;
        let moved = current.update_created_at(
            created_at,
            self.format.short_day(created_at),
            self.format.time_only(created_at),
        );

        self.storage.save(&moved)?;
        tracing::info!(id = %moved.id, "Changed log date");
        Ok(moved)
    }

    /// Delete a log, returning what was removed.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` for an unknown id.
    pub fn delete(&mut self, id: &str) -> Result<LogRecord> {
        let record = self.storage.find(id)?;
        self.storage.delete(record.id)?;
        tracing::info!(id = %record.id, "Deleted log");
        Ok(record)
    }

    /// Look up one log by id or unique id prefix.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` for an unknown id.
    pub fn show(&self, id: &str) -> Result<LogRecord> {
        self.storage.find(id)
    }

    /// A page of logs, newest first.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub fn list(&self, offset: usize, limit: usize) -> Result<Vec<LogRecord>> {
        self.storage.list(offset, limit)
    }

    /// Logs carrying `tag`; the leading `#` is optional.
    ///
    /// # Errors
    /// Returns `AppError::InvalidData` for an empty tag name.
    pub fn by_tag(&self, tag: &str) -> Result<Vec<LogRecord>> {
        let tag = normalize_tag(tag).ok_or_else(|| AppError::invalid("Empty tag name"))?;
        self.storage.list_by_tag(&tag)
    }

    /// Logs created within `range`, newest first.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub fn in_range(&self, range: DateRange) -> Result<Vec<LogRecord>> {
        self.storage.list_range(range.from, range.to)
    }

    /// Keyword search over text, tags and display date strings.
    ///
    /// # Errors
    /// Returns `AppError::InvalidData` for an empty keyword.
    pub fn search(&self, keyword: &str) -> Result<Vec<LogRecord>> {
        if keyword.trim().is_empty() {
            return Err(AppError::invalid("Empty search keyword"));
        }
        self.storage.search(keyword)
    }

    /// Tags in use, most used first.
    ///
    /// # Errors
    /// Returns error if the store cannot be read.
    pub fn tags(&self) -> Result<Vec<TagInfo>> {
        self.storage.tag_infos()
    }

    /// # Errors
    /// Returns error if the store cannot be read.
    pub fn stats(&self) -> Result<JournalStats> {
        self.storage.stats()
    }

    /// Write all logs, or those in `range`, as a CSV export to `destination`.
    ///
    /// # Errors
    /// Returns the writer's error if the file cannot be replaced.
    pub fn export_csv(
        &self,
        range: Option<DateRange>,
        encoding: ExportEncoding,
        destination: &Path,
    ) -> Result<ExportOutcome> {
        let records = match range {
            Some(range) => self.in_range(range)?,
            None => self.storage.list_all()?,
        };
        if records.is_empty() {
            tracing::info!("No logs to export");
            return Ok(ExportOutcome::NoRecords);
        }

        let text = build_export_text(&records, &self.format);
        write_export(&text, encoding, destination)?;

        Ok(ExportOutcome::Written {
            path: destination.to_path_buf(),
            count: records.len(),
        })
    }

    /// Write every log as a JSON backup to `destination`.
    ///
    /// # Errors
    /// Returns `AppError::Encode` or the writer's error.
    pub fn backup(&self, destination: &Path) -> Result<ExportOutcome> {
        let records = self.storage.list_all()?;
        if records.is_empty() {
            tracing::info!("No logs to back up");
            return Ok(ExportOutcome::NoRecords);
        }

        let bytes = to_backup_json(&records)?;
        write_backup(&bytes, destination)?;

        Ok(ExportOutcome::Written {
            path: destination.to_path_buf(),
            count: records.len(),
        })
    }

    /// Restore logs from a backup or CSV export. Existing ids are replaced.
    ///
    /// # Errors
    /// Returns `AppError::Read` if the file yields no logs, or a store error.
    pub fn import(&mut self, path: &Path, encoding: Option<ExportEncoding>) -> Result<usize> {
        let records = read_import_file(path, encoding, &self.format)?;
        import_records(&mut self.storage, &records)
    }
}
