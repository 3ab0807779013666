//! SQLite implementation of the storage collaborator.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::record::{HeaderRecord, IdentityMapping, MessageRecord, RecipientRecord};
use crate::store::MessageStore;

/// Fixed schema. Indexes are added after data import, in the finalize phase.
pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    message_key INTEGER PRIMARY KEY,
    from_address TEXT NOT NULL,
    to_addresses TEXT NOT NULL,
    subject TEXT NOT NULL,
    date TEXT NOT NULL,
    thread_id TEXT NOT NULL,
    labels TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS headers (
    message_key INTEGER NOT NULL,
    header TEXT NOT NULL,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipients (
    message_key INTEGER NOT NULL,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    header_origin TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS identity_map (
    real_address TEXT NOT NULL,
    surrogate_address TEXT NOT NULL,
    real_name TEXT NOT NULL,
    surrogate_name TEXT NOT NULL
);
";

/// SQLite-backed [`MessageStore`].
///
/// Inserts open a transaction lazily; [`MessageStore::commit_batch`] closes
/// it. Prepared statements are cached by rusqlite across the whole run.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
    in_batch: bool,
}

impl SqliteStore {
    /// Open (or create) the database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        // WAL keeps readers unblocked and speeds up bulk import.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        debug!(path = %path.display(), "Opened store");
        Ok(Self {
            conn,
            path,
            in_batch: false,
        })
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the store and hand back the raw connection (used by the
    /// report generator for ad hoc read queries).
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn begin_if_needed(&mut self) -> Result<()> {
        if !self.in_batch {
            self.conn.execute_batch("BEGIN")?;
            self.in_batch = true;
        }
        Ok(())
    }
}

impl MessageStore for SqliteStore {
    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        debug!("Schema ensured");
        Ok(())
    }

    fn is_empty(&mut self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count == 0)
    }

    fn insert_message(&mut self, record: &MessageRecord) -> Result<()> {
        self.begin_if_needed()?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO messages (message_key, from_address, to_addresses, subject, date, thread_id, labels)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        stmt.execute((
            record.message_key,
            &record.from,
            &record.to,
            &record.subject,
            &record.date,
            &record.thread_id,
            &record.labels,
        ))?;
        Ok(())
    }

    fn insert_header(&mut self, record: &HeaderRecord) -> Result<()> {
        self.begin_if_needed()?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO headers (message_key, header, value) VALUES (?1, ?2, ?3)",
        )?;
        stmt.execute((record.message_key, &record.header, &record.value))?;
        Ok(())
    }

    fn insert_recipient(&mut self, record: &RecipientRecord) -> Result<()> {
        self.begin_if_needed()?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO recipients (message_key, name, address, header_origin)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute((
            record.message_key,
            &record.name,
            &record.address,
            record.origin.as_str(),
        ))?;
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<()> {
        if self.in_batch {
            self.conn.execute_batch("COMMIT")?;
            self.in_batch = false;
        }
        Ok(())
    }

    fn persist_identity_map(&mut self, mappings: &[IdentityMapping]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO identity_map (real_address, surrogate_address, real_name, surrogate_name)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for mapping in mappings {
                stmt.execute((
                    &mapping.real_address,
                    &mapping.surrogate_address,
                    &mapping.real_name,
                    &mapping.surrogate_name,
                ))?;
            }
        }
        tx.commit()?;
        info!(identities = mappings.len(), "Identity mapping persisted");
        Ok(())
    }

    fn create_date_index(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_messages_date ON messages(date DESC)",
        )?;
        debug!("Date index created");
        Ok(())
    }
}
