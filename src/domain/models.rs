//! Domain models for journal data.
//!
//! A [`LogRecord`] is an immutable value: edits produce a new value carrying
//! the same `id`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::locale::FormatConfig;

/// One journaling entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Identifier assigned at creation.
    pub id: Uuid,
    /// Free-form user text.
    pub text: String,
    /// Hashtags, each starting with `#`.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Attached image paths, passed through untouched.
    #[serde(default)]
    pub images: BTreeSet<String>,
    /// Cached short day title, never re-derived after construction.
    pub create_day: String,
    /// Cached `HH:mm` display time.
    pub create_time: String,
    /// Logical creation time.
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    /// Last edit, absent until the first edit.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp::deserialize_option"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LogRecord {
    /// Create a record with a fresh id and display strings computed from `created_at`.
    #[must_use]
    pub fn new(text: impl Into<String>, created_at: DateTime<Utc>, format: &FormatConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            tags: BTreeSet::new(),
            images: BTreeSet::new(),
            create_day: format.short_day(created_at),
            create_time: format.time_only(created_at),
            created_at,
            updated_at: None,
        }
    }

    #[must_use]
    pub const fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: BTreeSet<String>) -> Self {
        self.images = images;
        self
    }

    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Override the cached day title.
    #[must_use]
    pub fn with_create_day(mut self, create_day: impl Into<String>) -> Self {
        self.create_day = create_day.into();
        self
    }

    /// Replace text and tags, stamping `updated_at`.
    #[must_use]
    pub fn update_text(
        &self,
        text: impl Into<String>,
        tags: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            text: text.into(),
            tags,
            updated_at: Some(now),
            ..self.clone()
        }
    }

    /// Move the record to another creation time with new display strings.
    #[must_use]
    pub fn update_created_at(
        &self,
        created_at: DateTime<Utc>,
        create_day: impl Into<String>,
        create_time: impl Into<String>,
    ) -> Self {
        Self {
            created_at,
            create_day: create_day.into(),
            create_time: create_time.into(),
            ..self.clone()
        }
    }

    /// Section header in list views.
    #[must_use]
    pub fn section_title(&self, format: &FormatConfig) -> String {
        format.long_day(self.created_at)
    }

    /// Whether this record belongs under `title`, by cached day or long title.
    #[must_use]
    pub fn is_same_section(&self, title: &str, format: &FormatConfig) -> bool {
        self.create_day == title || self.section_title(format) == title
    }
}

/// A hashtag as stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// A tag together with how many records carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    pub tag: Tag,
    pub count: usize,
}

/// Summary numbers for the journal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JournalStats {
    /// Number of records.
    pub log_count: usize,
    /// Number of distinct tags.
    pub tag_count: usize,
    /// Oldest record creation time.
    pub first_log: Option<DateTime<Utc>>,
    /// Newest record creation time.
    pub last_log: Option<DateTime<Utc>>,
}

/// Text encodings offered for CSV export and import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportEncoding {
    #[default]
    #[serde(rename = "utf8-bom")]
    Utf8Bom,
    #[serde(rename = "utf8")]
    Utf8,
    #[serde(rename = "shift-jis")]
    ShiftJis,
    #[serde(rename = "big5")]
    Big5,
    #[serde(rename = "gb2312")]
    Gb2312,
}

impl ExportEncoding {
    /// All encodings in menu order.
    pub const ALL: [Self; 5] = [
        Self::Utf8Bom,
        Self::Utf8,
        Self::ShiftJis,
        Self::Big5,
        Self::Gb2312,
    ];

    /// The concrete transcoder. GB2312 is served by the GBK superset.
    #[must_use]
    pub fn encoding(self) -> &'static Encoding {
        match self {
            Self::Utf8Bom | Self::Utf8 => encoding_rs::UTF_8,
            Self::ShiftJis => encoding_rs::SHIFT_JIS,
            Self::Big5 => encoding_rs::BIG5,
            Self::Gb2312 => encoding_rs::GBK,
        }
    }

    /// Whether exports start with the UTF-8 byte-order mark.
    #[must_use]
    pub const fn has_bom(self) -> bool {
        matches!(self, Self::Utf8Bom)
    }

    /// Configuration / CLI spelling.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Utf8Bom => "utf8-bom",
            Self::Utf8 => "utf8",
            Self::ShiftJis => "shift-jis",
            Self::Big5 => "big5",
            Self::Gb2312 => "gb2312",
        }
    }

    /// Label shown when choosing an export encoding.
    #[must_use]
    pub const fn export_title(self) -> &'static str {
        match self {
            Self::Utf8Bom => "UTF-8 (BOM) (Recommended)",
            Self::Utf8 => "UTF-8 code",
            Self::ShiftJis => "Shift_JIS code Japanese",
            Self::Big5 => "Big5 code Traditional Chinese",
            Self::Gb2312 => "GB2312 Simplified Chinese",
        }
    }

    /// Label shown in settings.
    #[must_use]
    pub const fn select_title(self) -> &'static str {
        match self {
            Self::Utf8Bom => "UTF-8 (BOM)",
            Self::Utf8 => "UTF-8",
            Self::ShiftJis => "Shift_JIS",
            Self::Big5 => "Big5",
            Self::Gb2312 => "GB2312",
        }
    }
}

impl std::str::FromStr for ExportEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "utf8-bom" | "utf-8-bom" | "bom" => Ok(Self::Utf8Bom),
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "shift-jis" | "shiftjis" | "sjis" => Ok(Self::ShiftJis),
            "big5" => Ok(Self::Big5),
            "gb2312" | "gbk" => Ok(Self::Gb2312),
            _ => Err(format!(
                "Unknown encoding: {s}. Use: utf8-bom, utf8, shift-jis, big5, gb2312"
            )),
        }
    }
}

impl std::fmt::Display for ExportEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Backup timestamps: RFC 3339 strings, or seconds since 2001-01-01 as
/// written by the mobile app.
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    /// Unix time of 2001-01-01T00:00:00Z.
    const REFERENCE_EPOCH_SECS: i64 = 978_307_200;

    const MAX_ABS_MILLIS: f64 = 9.0e18;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Text(String),
        Seconds(f64),
    }

    fn convert<E: Error>(raw: RawTimestamp) -> Result<DateTime<Utc>, E> {
        match raw {
            RawTimestamp::Text(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(E::custom),
            RawTimestamp::Seconds(secs) => {
                let out_of_range = || E::custom(format!("timestamp out of range: {secs}"));
                let millis = (secs * 1000.0).round();
                // Well inside i64, far beyond anything chrono can represent.
                if !millis.is_finite() || millis.abs() >= MAX_ABS_MILLIS {
                    return Err(out_of_range());
                }
                #[allow(clippy::cast_possible_truncation)]
                let millis = millis as i64;
                REFERENCE_EPOCH_SECS
                    .checked_mul(1000)
                    .and_then(|base| base.checked_add(millis))
                    .and_then(DateTime::from_timestamp_millis)
                    .ok_or_else(out_of_range)
            }
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        convert(RawTimestamp::deserialize(deserializer)?)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<RawTimestamp>::deserialize(deserializer)?
            .map(convert)
            .transpose()
    }
}
