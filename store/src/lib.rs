//! Credential claim store.
//!
//! Binds each provisioned student credential to at most one requester.
//!
//! # Architecture
//!
//! ```text
//! ClaimStore (Send + Sync, shared as Arc)
//! └── Mutex<Box<dyn ClaimBackend>>   single global critical section
//!     ├── FlatFileBackend  token:state[@claimant] lines, full rewrite on claim
//!     ├── SqliteBackend    conditional UPDATE inside an IMMEDIATE transaction
//!     └── MemoryBackend    HashMap, tests and ephemeral runs
//! ```
//!
//! Every public operation hashes the raw credential first; backends only ever
//! see [`CredentialToken`]s.

mod error;
mod flat_file;
mod memory;
mod secure_fs;
mod sqlite;

use std::sync::{Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use wiseacre_types::{AuthOutcome, ClaimRecord, ClaimantLabel, CredentialToken};

pub use error::StoreError;
pub use flat_file::FlatFileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Record counts reported by [`ClaimStore::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: u64,
    pub free: u64,
}

impl StoreStats {
    #[must_use]
    pub fn claimed(self) -> u64 {
        self.total - self.free
    }
}

/// Result of a bulk provisioning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub added: u64,
    pub skipped: u64,
}

/// Storage medium behind a [`ClaimStore`].
///
/// Implementations may assume calls are already serialized by the store's
/// global lock; they must still make each `claim` durable before returning
/// `Granted`.
pub trait ClaimBackend: Send {
    /// Short description for log lines (path or "memory").
    fn describe(&self) -> String;

    fn lookup(&mut self, token: &CredentialToken) -> Result<Option<ClaimRecord>, StoreError>;

    /// Insert a free record. Returns `false` if the token already exists.
    fn insert_free(&mut self, token: &CredentialToken) -> Result<bool, StoreError>;

    /// Insert many free records, returning how many were new.
    fn insert_many(&mut self, tokens: &[CredentialToken]) -> Result<u64, StoreError> {
        let mut added = 0;
        for token in tokens {
            if self.insert_free(token)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Compare-and-set: free → claimed by `claimant`.
    fn claim(
        &mut self,
        token: &CredentialToken,
        claimant: &ClaimantLabel,
    ) -> Result<AuthOutcome, StoreError>;

    fn stats(&mut self) -> Result<StoreStats, StoreError>;
}

/// Thread-safe facade over a [`ClaimBackend`].
pub struct ClaimStore {
    backend: Mutex<Box<dyn ClaimBackend>>,
    lock_timeout: Duration,
}

impl ClaimStore {
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);
    const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(2);

    pub fn new(backend: impl ClaimBackend + 'static) -> Self {
        Self {
            backend: Mutex::new(Box::new(backend)),
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Ephemeral store (for tests and dry runs).
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    /// Bound how long an operation waits for the global lock before
    /// reporting [`StoreError::LockTimeout`].
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Register a credential as free. Returns `false` if it was already known.
    pub fn provision(&self, raw_id: &str) -> Result<bool, StoreError> {
        let token = CredentialToken::from_raw(raw_id);
        let mut backend = self.lock()?;
        if backend.lookup(&token)?.is_some() {
            debug!(token = token.short(), "Credential already provisioned");
            return Ok(false);
        }
        let added = backend.insert_free(&token)?;
        if added {
            debug!(token = token.short(), "Credential provisioned");
        }
        Ok(added)
    }

    /// Bulk-load raw credentials. Blank entries are ignored; duplicates,
    /// both within the batch and against the store, count as skipped.
    pub fn provision_many<I, S>(&self, raw_ids: I) -> Result<ProvisionReport, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tokens: Vec<CredentialToken> = raw_ids
            .into_iter()
            .filter(|raw| !raw.as_ref().trim().is_empty())
            .map(|raw| CredentialToken::from_raw(raw.as_ref()))
            .collect();
        let submitted = tokens.len() as u64;
        tokens.sort();
        tokens.dedup();

        let added = self.lock()?.insert_many(&tokens)?;
        let report = ProvisionReport {
            added,
            skipped: submitted - added,
        };
        info!(added = report.added, skipped = report.skipped, "Bulk provisioning finished");
        Ok(report)
    }

    pub fn exists(&self, raw_id: &str) -> Result<bool, StoreError> {
        let token = CredentialToken::from_raw(raw_id);
        Ok(self.lock()?.lookup(&token)?.is_some())
    }

    /// Claim `raw_id` for `claimant` if it is provisioned and still free.
    ///
    /// Atomic per store: of any number of concurrent calls for the same
    /// credential, exactly one observes [`AuthOutcome::Granted`].
    pub fn authenticate(
        &self,
        raw_id: &str,
        claimant: &ClaimantLabel,
    ) -> Result<AuthOutcome, StoreError> {
        let token = CredentialToken::from_raw(raw_id);
        let outcome = self.lock()?.claim(&token, claimant)?;
        match &outcome {
            AuthOutcome::Granted => {
                info!(token = token.short(), claimant = %claimant, "Credential claimed");
            }
            AuthOutcome::NotFound => {
                debug!(token = token.short(), "Unknown credential presented");
            }
            AuthOutcome::AlreadyClaimed { claimant: existing } => {
                info!(
                    token = token.short(),
                    requester = %claimant,
                    holder = existing.as_ref().map_or("<unknown>", ClaimantLabel::as_str),
                    "Credential already claimed"
                );
            }
        }
        Ok(outcome)
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        self.lock()?.stats()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn ClaimBackend>>, StoreError> {
        let started = Instant::now();
        loop {
            match self.backend.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(poisoned)) => {
                    // Backends keep no half-applied state in memory; the
                    // durable copy is authoritative.
                    let guard = poisoned.into_inner();
                    warn!(backend = %guard.describe(), "Recovered poisoned claim store lock");
                    return Ok(guard);
                }
                Err(TryLockError::WouldBlock) => {
                    let waited = started.elapsed();
                    if waited >= self.lock_timeout {
                        warn!(?waited, "Claim store lock wait exceeded");
                        return Err(StoreError::LockTimeout { waited });
                    }
                    thread::sleep(Self::LOCK_POLL_INTERVAL);
                }
            }
        }
    }
}
