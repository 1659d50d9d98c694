//! Record serialization: CSV export lines and JSON backups.

use unicode_segmentation::UnicodeSegmentation;

use crate::domain::{AppError, FormatConfig, LogRecord, Result};

/// Header line written once at the top of every CSV export.
pub const EXPORT_HEADER: &str = "identifier,category,date,body,extended body\n";

/// Per-cell character ceiling of common spreadsheet applications.
pub const CELL_CHAR_LIMIT: usize = 32767;

/// Formats one record as a CSV export line (without line terminator).
///
/// Columns: upper-case UUID, tag names without `#` joined by `\n`,
/// `MM/dd/yyyy HH:mm:ss` creation time, the first [`CELL_CHAR_LIMIT`]
/// characters of the text, and the remainder of the text.
pub fn to_export_line(record: &LogRecord, format: &FormatConfig) -> String {
    let tag_cell = record
        .tags
        .iter()
        .map(|tag| tag.replace('#', ""))
        .collect::<Vec<_>>()
        .join("\n");
    let (body, extended) = split_cell_text(&record.text);

    format!(
        "{},{},{},{},{}",
        record.id.hyphenated().to_string().to_uppercase(),
        quote_cell(&tag_cell),
        format.export_timestamp(record.created_at),
        quote_cell(body),
        quote_cell(extended),
    )
}

/// Builds a whole export: header followed by one line per record.
pub fn build_export_text(records: &[LogRecord], format: &FormatConfig) -> String {
    let lines = records
        .iter()
        .map(|record| to_export_line(record, format))
        .collect::<Vec<_>>()
        .join("\n");

    let mut text = String::with_capacity(EXPORT_HEADER.len() + lines.len());
    text.push_str(EXPORT_HEADER);
    text.push_str(&lines);
    text
}

/// Splits `text` after [`CELL_CHAR_LIMIT`] user-perceived characters.
///
/// The second part is empty when the text fits in one cell; concatenating
/// both parts always yields `text`.
pub fn split_cell_text(text: &str) -> (&str, &str) {
    text.grapheme_indices(true)
        .nth(CELL_CHAR_LIMIT)
        .map_or((text, ""), |(index, _)| text.split_at(index))
}

fn quote_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Serializes records as a pretty-printed JSON array.
///
/// # Errors
/// Returns `AppError::Encode` if serialization fails.
pub fn to_backup_json(records: &[LogRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(records).map_err(AppError::encode)
}

/// Decodes a JSON backup. An empty array is a valid result here.
///
/// # Errors
/// Returns `AppError::Decode` if the bytes are not a JSON array of records.
pub fn from_backup_json(bytes: &[u8]) -> Result<Vec<LogRecord>> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    serde_json::from_slice(bytes).map_err(AppError::json_parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Language;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn format() -> FormatConfig {
        FormatConfig::with_offset_minutes(Language::En, 0)
    }

    fn record(text: &str) -> LogRecord {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        LogRecord::new(text, at, &format())
            .with_id(Uuid::parse_str("0e984725-c51c-4bf4-9960-e1c80e27aba0").unwrap())
    }

    #[test]
    fn test_export_line_layout() {
        let rec = record("went #running").with_tags(BTreeSet::from([
            "#running".to_string(),
            "#health".to_string(),
        ]));
        assert_eq!(
            to_export_line(&rec, &format()),
            "0E984725-C51C-4BF4-9960-E1C80E27ABA0,\"health\nrunning\",03/05/2024 14:07:09,\"went #running\",\"\""
        );
    }

    #[test]
    fn test_quotes_are_doubled() {
        let line = to_export_line(&record("say \"hi\""), &format());
        assert!(line.ends_with(",\"say \"\"hi\"\"\",\"\""));
    }

    #[test]
    fn test_long_text_is_split_not_truncated() {
        let text = format!("{}{}", "a".repeat(CELL_CHAR_LIMIT), "tail end");
        let (first, rest) = split_cell_text(&text);
        assert_eq!(first.chars().count(), CELL_CHAR_LIMIT);
        assert_eq!(rest, "tail end");
        assert_eq!(format!("{first}{rest}"), text);

        let line = to_export_line(&record(&text), &format());
        assert!(line.ends_with(",\"tail end\""));
    }

    #[test]
    fn test_split_keeps_graphemes_whole() {
        let text = format!("{}👍🏽x", "a".repeat(CELL_CHAR_LIMIT - 1));
        let (first, rest) = split_cell_text(&text);
        assert!(first.ends_with("👍🏽"));
        assert_eq!(rest, "x");
    }

    #[test]
    fn test_short_text_has_empty_extension() {
        assert_eq!(split_cell_text("short"), ("short", ""));
        assert_eq!(split_cell_text(""), ("", ""));
    }

    #[test]
    fn test_header_written_once() {
        let records = vec![record("one"), record("two")];
        let text = build_export_text(&records, &format());
        assert!(text.starts_with(EXPORT_HEADER));
        assert_eq!(text.matches("identifier,category").count(), 1);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_backup_json_roundtrip() {
        let edited = record("first #a").update_text(
            "first #a #b",
            BTreeSet::from(["#a".to_string(), "#b".to_string()]),
            Utc.with_ymd_and_hms(2024, 3, 6, 1, 2, 3).unwrap(),
        );
        let records = vec![
            edited.with_images(BTreeSet::from(["img/1.png".to_string()])),
            record(""),
        ];

        let bytes = to_backup_json(&records).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("\n  {"));
        assert_eq!(from_backup_json(&bytes).unwrap(), records);
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        assert!(matches!(
            from_backup_json(b"not json"),
            Err(AppError::Decode { .. })
        ));
        assert!(matches!(
            from_backup_json(br#"{"id": "x"}"#),
            Err(AppError::Decode { .. })
        ));
        assert!(from_backup_json(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_huge_numeric_date() {
        let json = br#"[{"id": "0E984725-C51C-4BF4-9960-E1C80E27ABA0", "text": "x",
            "createDay": "", "createTime": "", "createdAt": 1e300}]"#;
        assert!(matches!(
            from_backup_json(json),
            Err(AppError::Decode { .. })
        ));
    }
}
