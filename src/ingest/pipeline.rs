//! The import pipeline: streams an archive into the store.
//!
//! A pipeline instance runs exactly once, walking the phases
//! `Created → TablesEnsured → Streaming → Finalizing → Complete` in order.
//! Writes are committed in batches so a crash loses at most the open batch;
//! the identity mapping and the date index are written in the finalize
//! phase, exactly once per successful run.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::error::{Result, ScopeError};
use crate::identity::IdentityRegistry;
use crate::ingest::extract::extract;
use crate::parser::header::HeaderMap;
use crate::parser::mbox::MboxArchive;
use crate::store::MessageStore;

/// Pipeline phase. Transitions never skip a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    TablesEnsured,
    Streaming,
    Finalizing,
    Complete,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::TablesEnsured => "tables-ensured",
            Phase::Streaming => "streaming",
            Phase::Finalizing => "finalizing",
            Phase::Complete => "complete",
        }
    }
}

/// Outcome of a successful import run.
#[derive(Debug, Clone)]
pub struct ImportSummary {
    /// Messages read from the archive and written to the store.
    pub message_count: u64,
    /// Distinct identities resolved across all participant headers.
    pub identity_count: usize,
    /// Batch commits issued during streaming (`ceil(messages / batch_size)`).
    pub commit_count: u64,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

/// Single-use import pipeline binding a store to an import configuration.
///
/// The registry and all counters are exclusively owned by the pipeline for
/// the run's lifetime; nothing is shared across runs except the store.
pub struct ImportPipeline<'a, S: MessageStore> {
    store: &'a mut S,
    config: &'a ImportConfig,
    phase: Phase,
}

impl<'a, S: MessageStore> ImportPipeline<'a, S> {
    pub fn new(store: &'a mut S, config: &'a ImportConfig) -> Self {
        Self {
            store,
            config,
            phase: Phase::Created,
        }
    }

    /// Run the full import against `archive`.
    ///
    /// Fails before streaming when the store already contains messages
    /// (re-import requires a fresh store). Storage failures during a flush
    /// are fatal; batches committed before the failure remain durable and
    /// queryable, with the date index and identity mapping absent.
    pub fn run(
        &mut self,
        archive: &MboxArchive,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<ImportSummary> {
        let start = Instant::now();

        self.advance(Phase::Created, Phase::TablesEnsured)?;
        self.store.ensure_schema()?;
        if !self.store.is_empty()? {
            return Err(ScopeError::StoreNotEmpty);
        }

        self.advance(Phase::TablesEnsured, Phase::Streaming)?;
        info!(archive = %archive.path().display(), "Streaming archive");

        let mut registry = IdentityRegistry::new(
            self.config.pseudonymize,
            self.config.dot_insensitive_providers.clone(),
        );
        let batch_size = self.config.batch_size.max(1);
        let mut failure: Option<ScopeError> = None;
        let mut commit_count: u64 = 0;
        let mut pending: u64 = 0;

        let store = &mut *self.store;
        let message_count = archive.stream(
            &mut |msg| {
                let headers = HeaderMap::parse(msg.headers);
                let extracted = extract(msg.key, msg.envelope, &headers, &mut registry);

                let written = (|| -> Result<()> {
                    store.insert_message(&extracted.message)?;
                    for header in &extracted.headers {
                        store.insert_header(header)?;
                    }
                    for recipient in &extracted.recipients {
                        store.insert_recipient(recipient)?;
                    }
                    Ok(())
                })();

                if let Err(e) = written {
                    failure = Some(e);
                    return false;
                }

                pending += 1;
                if pending >= batch_size {
                    if let Err(e) = store.commit_batch() {
                        failure = Some(e);
                        return false;
                    }
                    commit_count += 1;
                    pending = 0;
                }
                true
            },
            progress,
        )?;

        if let Some(e) = failure {
            warn!(committed_batches = commit_count, "Import aborted mid-stream");
            return Err(e);
        }

        // Flush the final partial batch
        if pending > 0 {
            self.store.commit_batch()?;
            commit_count += 1;
        }

        self.advance(Phase::Streaming, Phase::Finalizing)?;
        let identity_count = registry.identity_count();
        if self.config.pseudonymize {
            self.store.persist_identity_map(&registry.into_mappings())?;
        }
        self.store.create_date_index()?;

        self.advance(Phase::Finalizing, Phase::Complete)?;
        let summary = ImportSummary {
            message_count,
            identity_count,
            commit_count,
            elapsed: start.elapsed(),
        };
        info!(
            messages = summary.message_count,
            identities = summary.identity_count,
            commits = summary.commit_count,
            "Import complete"
        );
        Ok(summary)
    }

    /// Guarded phase transition: fails loudly on out-of-order use.
    fn advance(&mut self, from: Phase, to: Phase) -> Result<()> {
        if self.phase != from {
            return Err(ScopeError::InvalidState {
                expected: from.name(),
                actual: self.phase.name(),
            });
        }
        self.phase = to;
        Ok(())
    }
}
