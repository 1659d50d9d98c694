//! Local SQLite storage for journal records.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text so that string
//! order matches time order.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Params, Transaction};
use uuid::Uuid;

use crate::domain::{AppError, JournalStats, LogRecord, RecordStore, Result, Tag, TagInfo};

const LOG_COLUMNS: &str = "l.id, l.text, l.create_day, l.create_time, l.created_at, l.updated_at";

/// Local storage repository using SQLite.
pub struct LocalStorage {
    conn: Connection,
}

impl LocalStorage {
    /// Opens or creates the record database.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or schema creation fails.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }

        let conn = Connection::open(path).map_err(AppError::database)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(AppError::database)?;

        let storage = Self { conn };
        storage.init_schema()?;

        tracing::debug!("Opened record store at {}", path.display());
        Ok(storage)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r"
            CREATE TABLE IF NOT EXISTS logs (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL DEFAULT '',
                create_day TEXT NOT NULL DEFAULT '',
                create_time TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT
            );

            CREATE TABLE IF NOT EXISTS tags (
                name TEXT PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS log_tags (
                log_id TEXT NOT NULL REFERENCES logs(id) ON DELETE CASCADE,
                tag_name TEXT NOT NULL REFERENCES tags(name) ON DELETE CASCADE,
                PRIMARY KEY (log_id, tag_name)
            );

            CREATE TABLE IF NOT EXISTS images (
                log_id TEXT NOT NULL REFERENCES logs(id) ON DELETE CASCADE,
                path TEXT NOT NULL,
                PRIMARY KEY (log_id, path)
            );

            CREATE INDEX IF NOT EXISTS idx_logs_created
                ON logs(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_log_tags_tag
                ON log_tags(tag_name);
            ",
            )
            .map_err(AppError::database)?;

        Ok(())
    }

    /// Inserts or replaces one record.
    ///
    /// # Errors
    /// Returns error if the write fails.
    pub fn save(&mut self, record: &LogRecord) -> Result<()> {
        self.upsert_records(std::slice::from_ref(record)).map(|_| ())
    }

    /// Get a record by its exact id.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no record has this id.
    pub fn get(&self, id: Uuid) -> Result<LogRecord> {
        self.query_logs(
            &format!("SELECT {LOG_COLUMNS} FROM logs l WHERE l.id = ?1"),
            [id.to_string()],
        )?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound { id: id.to_string() })
    }

    /// Find a record by full id or unique id prefix, case-insensitive.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` when nothing matches and
    /// `AppError::InvalidData` when the prefix is ambiguous.
    pub fn find(&self, id_prefix: &str) -> Result<LogRecord> {
        let prefix = id_prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(AppError::invalid("Empty log id"));
        }

        let mut matches = self.query_logs(
            &format!(
                "SELECT {LOG_COLUMNS} FROM logs l WHERE substr(l.id, 1, length(?1)) = ?1 LIMIT 2"
            ),
            [&prefix],
        )?;

        match matches.len() {
            0 => Err(AppError::NotFound { id: prefix }),
            1 => Ok(matches.remove(0)),
            _ => Err(AppError::invalid(format!(
                "Log id prefix '{prefix}' is ambiguous"
            ))),
        }
    }

    /// Delete a record and its tag and image links.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no record has this id.
    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        let tx = self.conn.transaction().map_err(AppError::database)?;

        let removed = tx
            .execute("DELETE FROM logs WHERE id = ?1", [id.to_string()])
            .map_err(AppError::database)?;
        if removed == 0 {
            return Err(AppError::NotFound { id: id.to_string() });
        }

        prune_unused_tags(&tx)?;
        tx.commit().map_err(AppError::database)?;

        tracing::debug!("Deleted log {}", id);
        Ok(())
    }

    /// Records newest first, skipping `offset` and returning at most `limit`.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list(&self, offset: usize, limit: usize) -> Result<Vec<LogRecord>> {
        self.query_logs(
            &format!(
                "SELECT {LOG_COLUMNS} FROM logs l
                 ORDER BY l.created_at DESC LIMIT ?1 OFFSET ?2"
            ),
            params![to_sql_count(limit), to_sql_count(offset)],
        )
    }

    /// Every record, newest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_all(&self) -> Result<Vec<LogRecord>> {
        self.query_logs(
            &format!("SELECT {LOG_COLUMNS} FROM logs l ORDER BY l.created_at DESC"),
            [],
        )
    }

    /// Records carrying `tag` (with leading `#`), newest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_by_tag(&self, tag: &str) -> Result<Vec<LogRecord>> {
        self.query_logs(
            &format!(
                "SELECT {LOG_COLUMNS} FROM logs l
                 JOIN log_tags t ON t.log_id = l.id
                 WHERE t.tag_name = ?1
                 ORDER BY l.created_at DESC"
            ),
            [tag],
        )
    }

    /// Records created in `[from, to)`, newest first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn list_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<LogRecord>> {
        self.query_logs(
            &format!(
                "SELECT {LOG_COLUMNS} FROM logs l
                 WHERE l.created_at >= ?1 AND l.created_at < ?2
                 ORDER BY l.created_at DESC"
            ),
            [format_time(from), format_time(to)],
        )
    }

    /// Case-insensitive substring search over text, tag names and the
    /// cached day and time strings.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn search(&self, keyword: &str) -> Result<Vec<LogRecord>> {
        let pattern = format!("%{}%", escape_like(keyword.trim()));

        self.query_logs(
            &format!(
                r"SELECT {LOG_COLUMNS} FROM logs l
                 WHERE l.text LIKE ?1 ESCAPE '\'
                    OR l.create_day LIKE ?1 ESCAPE '\'
                    OR l.create_time LIKE ?1 ESCAPE '\'
                    OR EXISTS (
                        SELECT 1 FROM log_tags t
                        WHERE t.log_id = l.id AND t.tag_name LIKE ?1 ESCAPE '\'
                    )
                 ORDER BY l.created_at DESC"
            ),
            [pattern],
        )
    }

    /// Get record count.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get::<_, i64>(0))
            .map(from_sql_count)
            .map_err(AppError::database)
    }

    /// Every tag in use with its record count, most used first.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn tag_infos(&self) -> Result<Vec<TagInfo>> {
        let mut stmt = self
            .conn
            .prepare(
                r"
            SELECT tag_name, COUNT(*) AS uses
            FROM log_tags
            GROUP BY tag_name
            ORDER BY uses DESC, tag_name ASC
            ",
            )
            .map_err(AppError::database)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(TagInfo {
                    tag: Tag { name: row.get(0)? },
                    count: from_sql_count(row.get(1)?),
                })
            })
            .map_err(AppError::database)?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AppError::database)
    }

    /// Summary numbers for the journal.
    ///
    /// # Errors
    /// Returns error if the query fails.
    pub fn stats(&self) -> Result<JournalStats> {
        let (log_count, first, last) = self
            .conn
            .query_row(
                "SELECT COUNT(*), MIN(created_at), MAX(created_at) FROM logs",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .map_err(AppError::database)?;

        let tag_count = self
            .conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get::<_, i64>(0))
            .map_err(AppError::database)?;

        Ok(JournalStats {
            log_count: from_sql_count(log_count),
            tag_count: from_sql_count(tag_count),
            first_log: first.and_then(|s| parse_time_text(&s)),
            last_log: last.and_then(|s| parse_time_text(&s)),
        })
    }

    /// Runs a log query and loads tags and images for each row.
    fn query_logs<P: Params>(&self, sql: &str, params: P) -> Result<Vec<LogRecord>> {
        let mut stmt = self.conn.prepare(sql).map_err(AppError::database)?;
        let rows = stmt
            .query_map(params, Self::row_to_record)
            .map_err(AppError::database)?;

        let mut records = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AppError::database)?;

        for record in &mut records {
            record.tags =
                self.load_links("SELECT tag_name FROM log_tags WHERE log_id = ?1", record.id)?;
            record.images =
                self.load_links("SELECT path FROM images WHERE log_id = ?1", record.id)?;
        }

        Ok(records)
    }

    fn load_links(&self, sql: &str, id: Uuid) -> Result<BTreeSet<String>> {
        let mut stmt = self.conn.prepare_cached(sql).map_err(AppError::database)?;
        let rows = stmt
            .query_map([id.to_string()], |row| row.get::<_, String>(0))
            .map_err(AppError::database)?;

        rows.collect::<rusqlite::Result<BTreeSet<_>>>()
            .map_err(AppError::database)
    }

    /// Convert a row to a record without tags or images.
    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<LogRecord> {
        let id_str: String = row.get(0)?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        let created_at_str: String = row.get(4)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

        let updated_at_str: Option<String> = row.get(5)?;

        Ok(LogRecord {
            id,
            text: row.get(1)?,
            tags: BTreeSet::new(),
            images: BTreeSet::new(),
            create_day: row.get(2)?,
            create_time: row.get(3)?,
            created_at,
            updated_at: updated_at_str.and_then(|s| parse_time_text(&s)),
        })
    }
}

impl RecordStore for LocalStorage {
    fn upsert_records(&mut self, records: &[LogRecord]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(AppError::database)?;

        for record in records {
            write_record(&tx, record)?;
        }
        prune_unused_tags(&tx)?;

        tx.commit().map_err(AppError::database)?;

        tracing::debug!("Upserted {} logs", records.len());
        Ok(records.len())
    }
}

fn write_record(tx: &Transaction<'_>, record: &LogRecord) -> Result<()> {
    let id = record.id.to_string();

    tx.execute(
        r"
        INSERT INTO logs (id, text, create_day, create_time, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            text = excluded.text,
            create_day = excluded.create_day,
            create_time = excluded.create_time,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at
        ",
        params![
            &id,
            &record.text,
            &record.create_day,
            &record.create_time,
            format_time(record.created_at),
            record.updated_at.map(format_time),
        ],
    )
    .map_err(AppError::database)?;

    tx.execute("DELETE FROM log_tags WHERE log_id = ?1", [&id])
        .map_err(AppError::database)?;
    tx.execute("DELETE FROM images WHERE log_id = ?1", [&id])
        .map_err(AppError::database)?;

    for tag in &record.tags {
        tx.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", [tag])
            .map_err(AppError::database)?;
        tx.execute(
            "INSERT OR IGNORE INTO log_tags (log_id, tag_name) VALUES (?1, ?2)",
            params![&id, tag],
        )
        .map_err(AppError::database)?;
    }

    for image in &record.images {
        tx.execute(
            "INSERT OR IGNORE INTO images (log_id, path) VALUES (?1, ?2)",
            params![&id, image],
        )
        .map_err(AppError::database)?;
    }

    Ok(())
}

fn prune_unused_tags(tx: &Transaction<'_>) -> Result<()> {
    tx.execute(
        "DELETE FROM tags WHERE name NOT IN (SELECT tag_name FROM log_tags)",
        [],
    )
    .map_err(AppError::database)?;
    Ok(())
}

fn format_time(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time_text(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('%', r"\%")
        .replace('_', r"\_")
}

fn to_sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn from_sql_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FormatConfig, Language};
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn format() -> FormatConfig {
        FormatConfig::with_offset_minutes(Language::En, 0)
    }

    fn record(text: &str, tags: &[&str], day: u32) -> LogRecord {
        let at = Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap();
        LogRecord::new(text, at, &format())
            .with_tags(tags.iter().map(ToString::to_string).collect())
    }

    fn open(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::open(&dir.path().join("lifelog.db")).unwrap()
    }

    #[test]
    fn test_open_creates_schema() {
        let dir = tempdir().unwrap();
        let storage = open(&dir);

        let count: i64 = storage
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table'",
                [],
                |row| row.get(0),
            )
            .unwrap();

        assert_eq!(count, 4);
    }

    #[test]
    fn test_save_and_get_roundtrip() {
        let dir = tempdir().unwrap();
        let mut storage = open(&dir);

        let rec = record("run #a #b", &["#a", "#b"], 5)
            .with_images(BTreeSet::from(["images/1.png".to_string()]))
            .with_updated_at(Some(Utc::now()));
        storage.save(&rec).unwrap();

        assert_eq!(storage.get(rec.id).unwrap(), rec);
    }

    #[test]
    fn test_unreadable_row_fails_the_query() {
        let dir = tempdir().unwrap();
        let mut storage = open(&dir);
        storage.save(&record("fine", &[], 1)).unwrap();
        storage
            .conn
            .execute(
                "INSERT INTO logs (id, text, create_day, create_time, created_at)
                 VALUES (?1, 'broken', '', '', 'garbage')",
                [Uuid::new_v4().to_string()],
            )
            .unwrap();

        assert_eq!(storage.count().unwrap(), 2);
        assert!(matches!(storage.list_all(), Err(AppError::Database { .. })));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut storage = open(&dir);
        let records = vec![record("one #x", &["#x"], 1), record("two", &[], 2)];

        storage.upsert_records(&records).unwrap();
        storage.upsert_records(&records).unwrap();

        assert_eq!(storage.count().unwrap(), 2);
        assert_eq!(storage.tag_infos().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_replaces_fields_and_links() {
        let dir = tempdir().unwrap();
        let mut storage = open(&dir);
        let original = record("old #gone", &["#gone"], 1);
        storage.save(&original).unwrap();

        let edited = original.update_text(
            "new #kept",
            BTreeSet::from(["#kept".to_string()]),
            Utc::now(),
        );
        storage.save(&edited).unwrap();

        let loaded = storage.get(original.id).unwrap();
        assert_eq!(loaded.text, "new #kept");
        assert_eq!(loaded.tags, BTreeSet::from(["#kept".to_string()]));
        assert_eq!(storage.stats().unwrap().tag_count, 1);
    }

    #[test]
    fn test_list_newest_first_with_paging() {
        let dir = tempdir().unwrap();
        let mut storage = open(&dir);
        let records: Vec<_> = (1..=5).map(|d| record(&format!("day {d}"), &[], d)).collect();
        storage.upsert_records(&records).unwrap();

        let page = storage.list(1, 2).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].text, "day 4");
        assert_eq!(page[1].text, "day 3");
    }

    #[test]
    fn test_range_tag_and_search() {
        let dir = tempdir().unwrap();
        let mut storage = open(&dir);
        storage
            .upsert_records(&[
                record("breakfast #food", &["#food"], 1),
                record("100% done", &[], 2),
                record("dinner #food #home", &["#food", "#home"], 3),
            ])
            .unwrap();

        let from = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let in_range = storage.list_range(from, from + Duration::days(2)).unwrap();
        assert_eq!(in_range.len(), 2);

        assert_eq!(storage.list_by_tag("#food").unwrap().len(), 2);
        assert_eq!(storage.search("HOME").unwrap().len(), 1);
        assert_eq!(storage.search("%").unwrap().len(), 1);
        assert_eq!(storage.search("02 Mar").unwrap().len(), 1);

        let infos = storage.tag_infos().unwrap();
        assert_eq!(infos[0].tag.name, "#food");
        assert_eq!(infos[0].count, 2);
    }

    #[test]
    fn test_find_by_prefix_and_delete() {
        let dir = tempdir().unwrap();
        let mut storage = open(&dir);
        let rec = record("bye #tmp", &["#tmp"], 1);
        storage.save(&rec).unwrap();

        let prefix = rec.id.to_string()[..8].to_uppercase();
        assert_eq!(storage.find(&prefix).unwrap().id, rec.id);

        storage.delete(rec.id).unwrap();
        assert!(matches!(storage.get(rec.id), Err(AppError::NotFound { .. })));
        assert!(matches!(storage.delete(rec.id), Err(AppError::NotFound { .. })));
        assert_eq!(storage.stats().unwrap().tag_count, 0);
    }

    #[test]
    fn test_stats_bounds() {
        let dir = tempdir().unwrap();
        let mut storage = open(&dir);
        assert_eq!(storage.stats().unwrap().log_count, 0);

        storage
            .upsert_records(&[record("a", &[], 4), record("b", &[], 9)])
            .unwrap();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.log_count, 2);
        assert_eq!(stats.first_log, Some(Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()));
        assert_eq!(stats.last_log, Some(Utc.with_ymd_and_hms(2024, 3, 9, 9, 0, 0).unwrap()));
    }
}
