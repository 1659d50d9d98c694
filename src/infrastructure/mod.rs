//! Infrastructure layer - external adapters (database, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod export_writer;
pub mod local_storage;

pub use config::{config_file_path, ensure_config_exists, load_config, save_config};
pub use export_writer::{encode_export, write_backup, write_export};
pub use local_storage::LocalStorage;
