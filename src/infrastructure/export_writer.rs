//! Writing export and backup files.
//!
//! Destinations are single-slot: any previous file is removed first, and a
//! failure to remove it aborts the write.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::domain::{AppError, ExportEncoding, Result};

/// UTF-8 byte-order mark.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Transcodes export text into file bytes.
///
/// Characters the target encoding cannot represent are replaced with
/// numeric character references; `Utf8Bom` output starts with `EF BB BF`.
pub fn encode_export(text: &str, encoding: ExportEncoding) -> Vec<u8> {
    let (encoded, _, had_unmappable) = encoding.encoding().encode(text);
    if had_unmappable {
        tracing::warn!(
            encoding = %encoding,
            "Some characters are not representable and were replaced"
        );
    }

    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + encoded.len());
    if encoding.has_bom() {
        bytes.extend_from_slice(&UTF8_BOM);
    }
    bytes.extend_from_slice(&encoded);
    bytes
}

/// Writes a CSV export to `destination` in the chosen encoding.
///
/// # Errors
/// Returns `DeleteOldFile`, `CreateDirectory` or `Write` for the step that failed.
pub fn write_export(text: &str, encoding: ExportEncoding, destination: &Path) -> Result<()> {
    write_file(&encode_export(text, encoding), destination)?;
    tracing::info!(path = %destination.display(), encoding = %encoding, "CSV export written");
    Ok(())
}

/// Writes backup bytes to `destination`.
///
/// # Errors
/// Returns `DeleteOldFile`, `CreateDirectory` or `Write` for the step that failed.
pub fn write_backup(bytes: &[u8], destination: &Path) -> Result<()> {
    write_file(bytes, destination)?;
    tracing::info!(path = %destination.display(), "Backup written");
    Ok(())
}

fn write_file(bytes: &[u8], destination: &Path) -> Result<()> {
    remove_old_file(destination)?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|source| AppError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(destination, bytes).map_err(|e| AppError::write(destination, e))?;
    tracing::debug!("Wrote {} bytes to {}", bytes.len(), destination.display());

    Ok(())
}

fn remove_old_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed previous file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(AppError::DeleteOldFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}
