//! Row types written to the relational store.
//!
//! All rows are insert-only: the import pipeline creates them once per
//! archive message and never mutates or deletes them afterwards.

/// One row in the `messages` table — the per-message metadata index.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageRecord {
    /// Archive-assigned ordinal, unique within the archive. Primary key.
    pub message_key: u64,

    /// Comma-joined formatted `Name <address>` for every resolved unique
    /// From entry.
    pub from: String,

    /// Comma-joined formatted `Name <address>` for every resolved unique
    /// To entry.
    pub to: String,

    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: String,

    /// ISO-8601 UTC timestamp (`YYYY-MM-DD HH:MM:SS`), or empty when no
    /// parseable date exists. Empty means "unknown", never epoch.
    pub date: String,

    /// Archive-provided thread identifier (`X-GM-THRID`). Empty is legal
    /// and denotes a single-message thread.
    pub thread_id: String,

    /// Comma-joined provider labels (`X-Gmail-Labels`), e.g.
    /// `"Chat"`, `"Inbox,Important"`.
    pub labels: String,
}

/// Which header a recipient row was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientOrigin {
    To,
    Cc,
}

impl RecipientOrigin {
    /// The value stored in the `header_origin` column.
    pub fn as_str(self) -> &'static str {
        match self {
            RecipientOrigin::To => "To",
            RecipientOrigin::Cc => "CC",
        }
    }
}

/// One row in the `recipients` table — a single resolved recipient of a
/// message, deduplicated across the To and CC lists.
#[derive(Debug, Clone)]
pub struct RecipientRecord {
    pub message_key: u64,
    /// Effective (possibly surrogate) display name.
    pub name: String,
    /// Effective (possibly surrogate) canonical address.
    pub address: String,
    pub origin: RecipientOrigin,
}

/// One row in the `headers` table — a verbatim archival copy of a single
/// header. Never pseudonymized: this table is the ground truth.
#[derive(Debug, Clone)]
pub struct HeaderRecord {
    pub message_key: u64,
    /// Header name with its original casing.
    pub header: String,
    /// Unfolded header value, transport encoding intact.
    pub value: String,
}

/// One row in the `identity_map` table — the real-to-surrogate mapping for
/// a single identity, written once at end-of-run when pseudonymization is
/// enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMapping {
    pub real_address: String,
    pub surrogate_address: String,
    pub real_name: String,
    pub surrogate_name: String,
}
