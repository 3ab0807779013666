//! Relational storage collaborator.
//!
//! The import pipeline writes through the [`MessageStore`] trait; the
//! SQLite implementation lives in [`sqlite`]. Keeping the trait seam here
//! lets tests observe batching behavior with an in-memory fake.

pub mod sqlite;

use crate::error::Result;
use crate::model::record::{HeaderRecord, IdentityMapping, MessageRecord, RecipientRecord};

pub use sqlite::SqliteStore;

/// Write-side contract consumed by the import pipeline.
///
/// Inserts accumulate inside an open batch; `commit_batch` is the
/// transaction boundary. A flushed batch is durable even if a later batch
/// fails. `persist_identity_map` and `create_date_index` are finalize-phase
/// operations with their own transaction handling, called exactly once per
/// successful run.
pub trait MessageStore {
    /// Create the fixed tables if they do not exist. Idempotent.
    fn ensure_schema(&mut self) -> Result<()>;

    /// Whether the store holds no imported messages yet.
    fn is_empty(&mut self) -> Result<bool>;

    fn insert_message(&mut self, record: &MessageRecord) -> Result<()>;

    fn insert_header(&mut self, record: &HeaderRecord) -> Result<()>;

    fn insert_recipient(&mut self, record: &RecipientRecord) -> Result<()>;

    /// Commit the currently open batch. No-op when nothing is pending.
    fn commit_batch(&mut self) -> Result<()>;

    /// Write the identity mapping table in a single transaction.
    fn persist_identity_map(&mut self, mappings: &[IdentityMapping]) -> Result<()>;

    /// Create the date-descending index over messages. Idempotent.
    fn create_date_index(&mut self) -> Result<()>;
}
