//! Output formatting for journal records.
//!
//! Supports multiple output formats: Markdown, JSON, and table view.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{FormatConfig, JournalStats, LogRecord, TagInfo};

/// Output format options.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable Markdown format.
    Markdown,
    /// JSON format for programmatic use.
    Json,
    /// Compact table listing.
    #[default]
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => Err(format!("Unknown format: {s}. Use: markdown, json, table")),
        }
    }
}

/// Formats records in `format`.
///
/// # Errors
/// Returns error if JSON serialization fails.
pub fn format_records(
    records: &[LogRecord],
    format: OutputFormat,
    dates: &FormatConfig,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Markdown => Ok(format_records_markdown(records, dates)),
        OutputFormat::Json => format_records_json(records),
        OutputFormat::Table => Ok(format_records_table(records)),
    }
}

/// Formats records as Markdown, one section per day.
pub fn format_records_markdown(records: &[LogRecord], dates: &FormatConfig) -> String {
    let mut out = String::new();
    let mut section: Option<String> = None;

    for record in records {
        let in_section = section
            .as_deref()
            .is_some_and(|title| record.is_same_section(title, dates));
        if !in_section {
            let title = record.section_title(dates);
            out.push_str(&format!("## {title}\n\n"));
            section = Some(title);
        }

        out.push_str(&format!(
            "### {} `{}`\n\n",
            record.create_time,
            short_id(record)
        ));
        out.push_str(&record.text);
        out.push_str("\n\n");

        if !record.tags.is_empty() {
            let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
            out.push_str(&format!("*Tags: {}*\n\n", tags.join(" ")));
        }

        if let Some(dt) = record.updated_at {
            out.push_str(&format!("*Edited: {}*\n\n", dates.export_timestamp(dt)));
        }

        out.push_str("---\n\n");
    }

    out
}

/// Formats records as JSON in the backup shape.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_records_json(records: &[LogRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Formats a table listing of records.
pub fn format_records_table(records: &[LogRecord]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Day", "Time", "Tags", "Text"]);

    for record in records {
        let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();

        table.add_row(vec![
            short_id(record),
            record.create_day.clone(),
            record.create_time.clone(),
            truncate(&tags.join(" "), 24),
            truncate(&record.text, 40),
        ]);
    }

    table.to_string()
}

/// Formats the tag listing with per-tag counts.
pub fn format_tags_table(tags: &[TagInfo]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Tag", "Logs"]);

    for info in tags {
        table.add_row(vec![info.tag.name.clone(), info.count.to_string()]);
    }

    table.to_string()
}

/// Formats journal statistics for display.
pub fn format_stats(stats: &JournalStats, dates: &FormatConfig) -> String {
    let day = |dt: Option<chrono::DateTime<chrono::Utc>>| {
        dt.map_or_else(|| "-".to_string(), |dt| dates.long_day(dt))
    };

    format!(
        "{}\n  Logs: {}\n  Tags: {}\n  First log: {}\n  Latest log: {}",
        "📊 Statistics".bold(),
        stats.log_count.to_string().cyan(),
        stats.tag_count.to_string().cyan(),
        day(stats.first_log).as_str().green(),
        day(stats.last_log).as_str().green()
    )
}

fn short_id(record: &LogRecord) -> String {
    record.id.to_string()[..8].to_string()
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Language;
    use chrono::{TimeZone, Utc};

    fn dates() -> FormatConfig {
        FormatConfig::with_offset_minutes(Language::En, 0)
    }

    fn record(text: &str, day: u32, hour: u32) -> LogRecord {
        let at = Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        LogRecord::new(text, at, &dates())
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world!", 8), "hello...");
        assert_eq!(truncate("日本語のテキスト", 6), "日本語...");
        assert_eq!(truncate("first\nsecond", 20), "first");
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!(
            "markdown".parse::<OutputFormat>(),
            Ok(OutputFormat::Markdown)
        ));
        assert!(matches!(
            "json".parse::<OutputFormat>(),
            Ok(OutputFormat::Json)
        ));
        assert!(matches!(
            "table".parse::<OutputFormat>(),
            Ok(OutputFormat::Table)
        ));
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_markdown_groups_by_day() {
        let records = vec![record("late", 5, 20), record("early", 5, 8), record("before", 4, 9)];
        let out = format_records_markdown(&records, &dates());

        let sections = out.lines().filter(|line| line.starts_with("## ")).count();
        assert_eq!(sections, 2);
        assert!(out.starts_with("## 05 Mar. 2024(Tue)\n\n### 20:00"));
        assert!(out.contains("## 04 Mar. 2024(Mon)"));
    }

    #[test]
    fn test_table_lists_every_record() {
        let records = vec![record("first", 5, 20), record("second", 6, 8)];
        let out = format_records_table(&records);
        assert!(out.contains("first"));
        assert!(out.contains("06 Mar.(Wed)"));
    }
}
