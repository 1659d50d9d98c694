//! Display language and date formatting.
//!
//! Every date shown to the user or written to an export goes through a
//! [`FormatConfig`] passed in by the caller.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

/// Fixed timestamp layout of the CSV `date` column (`MM/dd/yyyy HH:mm:ss`).
pub const EXPORT_DATE_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Supported display languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ja", alias = "jp")]
    Ja,
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    /// All languages in menu order.
    pub const ALL: [Self; 4] = [Self::Ja, Self::En, Self::ZhCn, Self::ZhTw];

    /// Configuration code of this language.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ja => "ja",
            Self::En => "en",
            Self::ZhCn => "zh-CN",
            Self::ZhTw => "zh-TW",
        }
    }

    /// Native name of the language.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Ja => "日本語",
            Self::En => "English",
            Self::ZhCn => "简体中文",
            Self::ZhTw => "繁體中文",
        }
    }

    fn weekday(self, day: Weekday) -> &'static str {
        const JA: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];
        const EN: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        const ZH_CN: [&str; 7] = ["周一", "周二", "周三", "周四", "周五", "周六", "周日"];
        const ZH_TW: [&str; 7] = ["週一", "週二", "週三", "週四", "週五", "週六", "週日"];

        let index = day.num_days_from_monday() as usize;
        match self {
            Self::Ja => JA[index],
            Self::En => EN[index],
            Self::ZhCn => ZH_CN[index],
            Self::ZhTw => ZH_TW[index],
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ja" | "jp" => Ok(Self::Ja),
            "en" => Ok(Self::En),
            "zh-cn" => Ok(Self::ZhCn),
            "zh-tw" => Ok(Self::ZhTw),
            _ => Err(format!("Unknown language: {s}. Use: ja, en, zh-CN, zh-TW")),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Language and time zone used to render and parse dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatConfig {
    pub language: Language,
    pub utc_offset: FixedOffset,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self::local(Language::default())
    }
}

impl FormatConfig {
    #[must_use]
    pub const fn new(language: Language, utc_offset: FixedOffset) -> Self {
        Self {
            language,
            utc_offset,
        }
    }

    /// Uses the system's current UTC offset.
    #[must_use]
    pub fn local(language: Language) -> Self {
        Self::new(language, *Local::now().offset())
    }

    /// Fixed offset in minutes east of UTC; falls back to UTC when out of range.
    #[must_use]
    pub fn with_offset_minutes(language: Language, minutes: i32) -> Self {
        let offset = minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self::new(language, offset)
    }

    fn localize(&self, dt: DateTime<Utc>) -> DateTime<FixedOffset> {
        dt.with_timezone(&self.utc_offset)
    }

    /// Short day title, e.g. `05 Mar.(Tue)` or `03月05日（火）`.
    #[must_use]
    pub fn short_day(&self, dt: DateTime<Utc>) -> String {
        let local = self.localize(dt);
        let weekday = self.language.weekday(local.weekday());
        match self.language {
            Language::En => format!("{}.({weekday})", local.format("%d %b")),
            Language::Ja | Language::ZhCn | Language::ZhTw => {
                format!("{}（{weekday}）", local.format("%m月%d日"))
            }
        }
    }

    /// Long day title including the year, used for list sections.
    #[must_use]
    pub fn long_day(&self, dt: DateTime<Utc>) -> String {
        let local = self.localize(dt);
        let weekday = self.language.weekday(local.weekday());
        match self.language {
            Language::En => format!("{}({weekday})", local.format("%d %b. %Y")),
            Language::Ja | Language::ZhCn | Language::ZhTw => {
                format!("{}（{weekday}）", local.format("%Y年%m月%d日"))
            }
        }
    }

    /// `HH:mm`.
    #[must_use]
    pub fn time_only(&self, dt: DateTime<Utc>) -> String {
        self.localize(dt).format("%H:%M").to_string()
    }

    /// Timestamp as written to the CSV `date` column.
    #[must_use]
    pub fn export_timestamp(&self, dt: DateTime<Utc>) -> String {
        self.localize(dt).format(EXPORT_DATE_FORMAT).to_string()
    }

    /// Parses a CSV `date` column value in this config's offset.
    #[must_use]
    pub fn parse_export_timestamp(&self, value: &str) -> Option<DateTime<Utc>> {
        let naive = NaiveDateTime::parse_from_str(value.trim(), EXPORT_DATE_FORMAT).ok()?;
        self.utc_offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Parses a plain `YYYY-MM-DD` date as the start of that day in this offset.
    #[must_use]
    pub fn parse_day_start(&self, value: &str) -> Option<DateTime<Utc>> {
        let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()?;
        self.utc_offset
            .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Parses user input as `YYYY-MM-DD HH:MM[:SS]` or a plain day in this offset.
    #[must_use]
    pub fn parse_user_datetime(&self, value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
            .and_then(|naive| self.utc_offset.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| self.parse_day_start(value))
    }
}
