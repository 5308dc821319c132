//! SQLite-backed credential store.
//!
//! Claims are a conditional `UPDATE ... WHERE state = 'free'` inside an
//! `IMMEDIATE` transaction, so the compare-and-set holds even when a second
//! process shares the database file.

use std::path::Path;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::debug;
use wiseacre_types::{AuthOutcome, ClaimRecord, ClaimState, ClaimantLabel, CredentialToken};

use crate::secure_fs::prepare_db_path;
use crate::{ClaimBackend, StoreError, StoreStats};

pub struct SqliteBackend {
    db: Connection,
    label: String,
}

impl SqliteBackend {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS credentials (
            token TEXT PRIMARY KEY NOT NULL,
            state TEXT NOT NULL CHECK (state IN ('free', 'claimed')),
            claimant TEXT,
            created_at TEXT NOT NULL,
            claimed_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_credentials_state
        ON credentials(state);
    ";

    /// Open or create the credential database at `path`.
    ///
    /// `busy_timeout` bounds how long SQLite waits on a lock held by another
    /// connection before failing with `SQLITE_BUSY`.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref();
        prepare_db_path(path)?;

        let db = Connection::open(path)?;
        db.busy_timeout(busy_timeout)?;
        Self::initialize(db, path.display().to_string())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Connection::open_in_memory()?;
        Self::initialize(db, ":memory:".to_string())
    }

    fn initialize(db: Connection, label: String) -> Result<Self, StoreError> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        db.execute_batch(Self::SCHEMA)?;
        Ok(Self { db, label })
    }

    fn corrupt(&self, token: &CredentialToken, reason: String) -> StoreError {
        StoreError::Corrupt {
            location: format!("{} token {}", self.label, token.short()),
            reason,
        }
    }

    fn decode_row(
        &self,
        token: &CredentialToken,
        state: &str,
        claimant: Option<String>,
    ) -> Result<ClaimRecord, StoreError> {
        match state {
            s if s == ClaimState::Free.as_str() => Ok(ClaimRecord::Free),
            s if s == ClaimState::Claimed.as_str() => Ok(ClaimRecord::Claimed {
                claimant: claimant.and_then(|label| ClaimantLabel::new(label).ok()),
            }),
            other => Err(self.corrupt(token, format!("unknown state {other:?}"))),
        }
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl ClaimBackend for SqliteBackend {
    fn describe(&self) -> String {
        format!("sqlite {}", self.label)
    }

    fn lookup(&mut self, token: &CredentialToken) -> Result<Option<ClaimRecord>, StoreError> {
        let row: Option<(String, Option<String>)> = self
            .db
            .query_row(
                "SELECT state, claimant FROM credentials WHERE token = ?1",
                [token.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(state, claimant)| self.decode_row(token, &state, claimant))
            .transpose()
    }

    fn insert_free(&mut self, token: &CredentialToken) -> Result<bool, StoreError> {
        let inserted = self.db.execute(
            "INSERT OR IGNORE INTO credentials (token, state, created_at)
             VALUES (?1, 'free', ?2)",
            params![token.as_str(), now_iso8601()],
        )?;
        Ok(inserted == 1)
    }

    fn insert_many(&mut self, tokens: &[CredentialToken]) -> Result<u64, StoreError> {
        let created_at = now_iso8601();
        let tx = self.db.transaction()?;
        let mut added = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO credentials (token, state, created_at)
                 VALUES (?1, 'free', ?2)",
            )?;
            for token in tokens {
                added += stmt.execute(params![token.as_str(), &created_at])? as u64;
            }
        }
        tx.commit()?;
        debug!(added, submitted = tokens.len(), "Inserted credential batch");
        Ok(added)
    }

    fn claim(
        &mut self,
        token: &CredentialToken,
        claimant: &ClaimantLabel,
    ) -> Result<AuthOutcome, StoreError> {
        let tx = self
            .db
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let updated = tx.execute(
            "UPDATE credentials
             SET state = 'claimed', claimant = ?2, claimed_at = ?3
             WHERE token = ?1 AND state = 'free'",
            params![token.as_str(), claimant.as_str(), now_iso8601()],
        )?;
        if updated == 1 {
            tx.commit()?;
            return Ok(AuthOutcome::Granted);
        }

        let existing: Option<(String, Option<String>)> = tx
            .query_row(
                "SELECT state, claimant FROM credentials WHERE token = ?1",
                [token.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        tx.commit()?;

        match existing {
            None => Ok(AuthOutcome::NotFound),
            Some((state, claimant)) => match self.decode_row(token, &state, claimant)? {
                ClaimRecord::Claimed { claimant } => Ok(AuthOutcome::AlreadyClaimed { claimant }),
                ClaimRecord::Free => Err(self.corrupt(
                    token,
                    "record stayed free after a conditional claim".to_string(),
                )),
            },
        }
    }

    fn stats(&mut self) -> Result<StoreStats, StoreError> {
        let (total, free): (i64, i64) = self.db.query_row(
            "SELECT COUNT(*), COALESCE(SUM(state = 'free'), 0) FROM credentials",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(StoreStats {
            total: total as u64,
            free: free as u64,
        })
    }
}
