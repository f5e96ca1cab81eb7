//! Persistence for audit records.
//!
//! [`AuditStore`] is the seam between the audit services and wherever records live. Two
//! implementations are provided:
//!
//! - [`MemoryStore`]: process-local maps, used by tests and throwaway runs.
//! - [`FileStore`]: one JSON file per record under sharded directories.
//!
//! Generation records are append-only. Confirmation records are keyed by generation id and the
//! insert must be atomic: of two concurrent confirmations of one generation exactly one wins and
//! the other sees [`AuditError::Conflict`](crate::AuditError::Conflict).

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::model::{ConfirmationRecord, GenerationId, GenerationRecord};
use crate::AuditResult;

/// Durable storage for generation and confirmation records.
pub trait AuditStore: Send + Sync {
    /// Persists a new generation record.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRecord` if a record with the same id already exists.
    fn put_generation(&self, record: &GenerationRecord) -> AuditResult<()>;

    /// Loads a generation record by id, `None` if absent.
    fn get_generation(&self, id: &GenerationId) -> AuditResult<Option<GenerationRecord>>;

    /// Every generation record, oldest first.
    fn list_generations(&self) -> AuditResult<Vec<GenerationRecord>>;

    /// Persists a confirmation unless one already exists for the same generation.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` carrying the existing record's `confirmed_at` if the generation has
    /// already been confirmed.
    fn insert_confirmation(&self, record: &ConfirmationRecord) -> AuditResult<()>;

    /// Loads the confirmation for a generation, `None` if it has not been confirmed.
    fn get_confirmation(
        &self,
        generation_id: &GenerationId,
    ) -> AuditResult<Option<ConfirmationRecord>>;
}
