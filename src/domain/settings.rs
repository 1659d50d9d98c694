//! User configuration and data-directory layout.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::locale::{FormatConfig, Language};
use super::models::ExportEncoding;

/// Subdirectory holding the single-slot CSV export.
pub const EXPORT_DIR_NAME: &str = "lifelog";
/// Fixed CSV export file name.
pub const EXPORT_FILE_NAME: &str = "export_file.csv";
/// Subdirectory holding the single-slot JSON backup.
pub const BACKUP_DIR_NAME: &str = "letslog";
/// Extension of backup files.
pub const BACKUP_EXTENSION: &str = "letslog";
/// Fixed backup file name.
pub const BACKUP_FILE_NAME: &str = "backup_file.letslog";

/// Export preferences.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Encoding used for CSV exports and offered first on CSV import.
    #[serde(default)]
    pub encoding: ExportEncoding,
}

/// Display preferences.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    /// Language of day titles.
    #[serde(default)]
    pub language: Language,

    /// Offset from UTC in minutes; the system offset when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

impl DisplayConfig {
    /// Resolve into the value threaded through formatting calls.
    #[must_use]
    pub fn format_config(&self) -> FormatConfig {
        match self.utc_offset_minutes {
            Some(minutes) => FormatConfig::with_offset_minutes(self.language, minutes),
            None => FormatConfig::local(self.language),
        }
    }
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lifelog")
    }

    /// Get the record database path.
    #[must_use]
    pub fn storage_db_path(&self) -> PathBuf {
        self.data_dir().join("lifelog.db")
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir().join("config.toml")
    }

    /// Fixed destination of CSV exports.
    #[must_use]
    pub fn export_file_path(&self) -> PathBuf {
        self.data_dir().join(EXPORT_DIR_NAME).join(EXPORT_FILE_NAME)
    }

    /// Fixed destination of JSON backups.
    #[must_use]
    pub fn backup_file_path(&self) -> PathBuf {
        self.data_dir().join(BACKUP_DIR_NAME).join(BACKUP_FILE_NAME)
    }

    /// Date formatting settings.
    #[must_use]
    pub fn format_config(&self) -> FormatConfig {
        self.display.format_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.export.encoding, ExportEncoding::Utf8Bom);
        assert_eq!(config.display.language, Language::En);
        assert!(config.paths.data_dir.is_none());
    }

    #[test]
    fn test_fixed_export_paths() {
        let config = AppConfig {
            paths: PathConfig {
                data_dir: Some(PathBuf::from("/data")),
            },
            ..AppConfig::default()
        };
        assert_eq!(
            config.export_file_path(),
            PathBuf::from("/data/lifelog/export_file.csv")
        );
        assert_eq!(
            config.backup_file_path(),
            PathBuf::from("/data/letslog/backup_file.letslog")
        );
    }

    #[test]
    fn test_explicit_offset() {
        let display = DisplayConfig {
            language: Language::Ja,
            utc_offset_minutes: Some(540),
        };
        let format = display.format_config();
        assert_eq!(format.language, Language::Ja);
        assert_eq!(format.utc_offset.local_minus_utc(), 540 * 60);
    }
}
