//! Persistence seam for records.

use super::error::Result;
use super::models::LogRecord;

/// Anything that can take imported records. Must be idempotent on `id`:
/// an existing id has its fields replaced, an unknown id is inserted.
pub trait RecordStore {
    /// Inserts or replaces every record, returning how many were written.
    ///
    /// # Errors
    /// Returns error if the underlying store fails.
    fn upsert_records(&mut self, records: &[LogRecord]) -> Result<usize>;
}
