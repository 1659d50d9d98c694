//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Lifelog Configuration
# Auto-generated - edit as needed

[export]
# CSV export encoding: utf8-bom, utf8, shift-jis, big5, gb2312
encoding = "utf8-bom"

[display]
# Day title language: en, ja, zh-CN, zh-TW
language = "en"

# Offset from UTC in minutes (optional, defaults to the system offset)
# utc_offset_minutes = 540

[paths]
# Custom data directory (optional, defaults to ~/.lifelog)
# data_dir = "/custom/path"
"#;

/// Load configuration from `data_dir` (or the default data directory).
///
/// A `--data-dir` override always wins over `[paths] data_dir` in the file.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(data_dir: Option<&Path>) -> Result<AppConfig> {
    let config_path = config_file_path(data_dir);

    let mut config = if config_path.exists() {
        load_config_from_file(&config_path)?
    } else {
        tracing::debug!("No config at {}, using defaults", config_path.display());
        AppConfig::default()
    };

    if let Some(dir) = data_dir {
        config.paths.data_dir = Some(dir.to_path_buf());
    }

    Ok(config)
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })?;

    if let Some(minutes) = config.display.utc_offset_minutes {
        if minutes.unsigned_abs() >= 24 * 60 {
            return Err(AppError::Config {
                message: format!("utc_offset_minutes must be less than 24 hours, got {minutes}"),
            });
        }
    }

    Ok(config)
}

/// Save configuration to file.
///
/// # Errors
/// Returns error if file cannot be written.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let config_path = config.config_file_path();

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;

    fs::write(&config_path, content).map_err(|e| {
        AppError::io(
            format!("Failed to write config file: {}", config_path.display()),
            e,
        )
    })?;

    tracing::info!(path = %config_path.display(), "Configuration saved");

    Ok(())
}

/// Create default configuration file if it doesn't exist.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(data_dir: Option<&Path>) -> Result<PathBuf> {
    let config_path = config_file_path(data_dir);

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(config_path)
}

/// Get the path to the configuration file.
#[must_use]
pub fn config_file_path(data_dir: Option<&Path>) -> PathBuf {
    data_dir
        .map_or_else(AppConfig::default_data_dir, Path::to_path_buf)
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExportEncoding, Language};
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.export.encoding, ExportEncoding::Utf8Bom);
        assert_eq!(config.display.language, Language::En);
        assert!(config.display.utc_offset_minutes.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();

        let mut config = load_config(Some(dir.path())).unwrap();
        config.export.encoding = ExportEncoding::ShiftJis;
        config.display.language = Language::Ja;
        config.display.utc_offset_minutes = Some(540);
        save_config(&config).unwrap();

        let loaded = load_config(Some(dir.path())).unwrap();
        assert_eq!(loaded.export.encoding, ExportEncoding::ShiftJis);
        assert_eq!(loaded.display.language, Language::Ja);
        assert_eq!(loaded.display.utc_offset_minutes, Some(540));
        assert_eq!(loaded.data_dir(), dir.path());
    }

    #[test]
    fn test_ensure_config_exists_writes_default_once() {
        let dir = tempdir().unwrap();
        let path = ensure_config_exists(Some(dir.path())).unwrap();
        fs::write(&path, "[export]\nencoding = \"big5\"\n").unwrap();

        ensure_config_exists(Some(dir.path())).unwrap();
        let loaded = load_config_from_file(&path).unwrap();
        assert_eq!(loaded.export.encoding, ExportEncoding::Big5);
    }

    #[test]
    fn test_out_of_range_offset_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[display]\nutc_offset_minutes = 40000000\n").unwrap();

        assert!(matches!(
            load_config(Some(dir.path())),
            Err(AppError::Config { .. })
        ));

        fs::write(&path, "[display]\nutc_offset_minutes = -1439\n").unwrap();
        let loaded = load_config(Some(dir.path())).unwrap();
        assert_eq!(loaded.display.utc_offset_minutes, Some(-1439));
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[export]\nencoding = \"latin1\"\n").unwrap();

        assert!(matches!(
            load_config_from_file(&path),
            Err(AppError::Config { .. })
        ));
    }
}
