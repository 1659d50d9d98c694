//! Domain layer - core business types.
//!
//! This layer contains pure domain models, configuration values and error
//! types without any I/O.

pub mod error;
pub mod locale;
pub mod models;
pub mod settings;
pub mod store;

pub use error::{AppError, Result};
pub use locale::{FormatConfig, Language, EXPORT_DATE_FORMAT};
pub use models::{ExportEncoding, JournalStats, LogRecord, Tag, TagInfo};
pub use settings::{AppConfig, DisplayConfig, ExportConfig, PathConfig};
pub use store::RecordStore;
