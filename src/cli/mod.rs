//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;
use crate::domain::{ExportEncoding, Language};

/// Lifelog - a personal journal with hashtags, CSV export and JSON backup.
#[derive(Parser, Debug)]
#[command(name = "lifelog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: markdown, json, or table.
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Data directory (defaults to ~/.lifelog).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a new log. Hashtags in the text become tags.
    Add {
        /// Log text.
        text: String,

        /// Creation time as YYYY-MM-DD or "YYYY-MM-DD HH:MM" (now if not specified).
        #[arg(long)]
        at: Option<String>,
    },

    /// Replace the text of a log.
    Edit {
        /// Log ID (full or unique prefix).
        id: String,

        /// New text.
        text: String,
    },

    /// Move a log to another date and time.
    Redate {
        /// Log ID (full or unique prefix).
        id: String,

        /// New creation time as YYYY-MM-DD or "YYYY-MM-DD HH:MM".
        at: String,
    },

    /// Delete a log.
    Delete {
        /// Log ID (full or unique prefix).
        id: String,
    },

    /// List logs, newest first.
    List {
        /// Maximum number of logs to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Number of logs to skip.
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Only logs carrying this tag.
        #[arg(short, long, conflicts_with_all = ["from", "to"])]
        tag: Option<String>,

        /// First day to include (YYYY-MM-DD).
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Last day to include (YYYY-MM-DD).
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Show a single log in detail.
    Show {
        /// Log ID (full or unique prefix).
        id: String,
    },

    /// Search text, tags and dates for a keyword.
    Search {
        /// Keyword to look for.
        keyword: String,
    },

    /// List tags with the number of logs carrying each.
    Tags,

    /// Show statistics about stored logs.
    Stats,

    /// Export logs as CSV to the fixed export file.
    Export {
        /// Text encoding (defaults to the configured one).
        #[arg(short, long)]
        encoding: Option<ExportEncoding>,

        /// First day to include (YYYY-MM-DD).
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Last day to include (YYYY-MM-DD).
        #[arg(long, requires = "from")]
        to: Option<String>,

        /// Write here instead of the fixed export file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Back up every log as JSON to the fixed backup file.
    Backup {
        /// Write here instead of the fixed backup file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore logs from a .letslog backup or a .csv export.
    Import {
        /// File to import.
        path: PathBuf,

        /// Encoding of a CSV file (defaults to the configured one).
        #[arg(short, long)]
        encoding: Option<ExportEncoding>,
    },

    /// Show or change configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Create the default configuration file if missing.
    Init,

    /// Set the CSV export encoding.
    SetEncoding {
        /// utf8-bom, utf8, shift-jis, big5 or gb2312.
        encoding: ExportEncoding,
    },

    /// Set the display language.
    SetLanguage {
        /// en, ja, zh-CN or zh-TW.
        language: Language,
    },

    /// Set the UTC offset used for dates, in minutes.
    SetOffset {
        /// Minutes east of UTC; omit to follow the system.
        #[arg(allow_negative_numbers = true)]
        minutes: Option<i32>,
    },
}

impl Cli {
    /// Parse the output format argument.
    ///
    /// # Errors
    /// Returns a message naming the accepted formats.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_with_range() {
        let cli = Cli::try_parse_from([
            "lifelog", "export", "--encoding", "shift-jis", "--from", "2024-03-01", "--to",
            "2024-03-31",
        ])
        .unwrap();

        match cli.command {
            Commands::Export {
                encoding, from, to, ..
            } => {
                assert_eq!(encoding, Some(ExportEncoding::ShiftJis));
                assert_eq!(from.as_deref(), Some("2024-03-01"));
                assert_eq!(to.as_deref(), Some("2024-03-31"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_range_needs_both_ends() {
        assert!(Cli::try_parse_from(["lifelog", "list", "--from", "2024-03-01"]).is_err());
    }

    #[test]
    fn test_negative_offset() {
        let cli = Cli::try_parse_from(["lifelog", "config", "set-offset", "-300"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::SetOffset { minutes: Some(-300) }
            }
        ));
    }
}
