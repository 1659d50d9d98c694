//! Application layer - use cases and orchestration.
//!
//! This layer contains tag extraction, the export and backup codecs, the
//! import parser and the journal service tying them to storage.

pub mod codec;
pub mod formatter;
pub mod importer;
pub mod journal;
pub mod tags;

pub use codec::{build_export_text, from_backup_json, to_backup_json, to_export_line};
pub use formatter::{
    format_records, format_records_json, format_records_markdown, format_records_table,
    format_stats, format_tags_table, OutputFormat,
};
pub use importer::{import_records, parse_csv_backup, parse_json_backup, read_import_file};
pub use journal::{DateRange, ExportOutcome, JournalService};
pub use tags::extract_tags;
