use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure to reach or trust the backing credential store.
///
/// Every variant means "store unavailable" to the caller and the process keeps
/// running. Only [`StoreError::is_transient`] variants are worth retrying
/// without operator action.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store unavailable: {} does not exist", path.display())]
    Missing { path: PathBuf },
    #[error("timed out after {waited:?} waiting for the credential store lock")]
    LockTimeout { waited: Duration },
    #[error("credential store is corrupt at {location}: {reason}")]
    Corrupt { location: String, reason: String },
    #[error("credential store I/O failed on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("credential database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when a retry has a realistic chance of succeeding without
    /// operator intervention.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::LockTimeout { .. } => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            Self::Missing { .. } | Self::Corrupt { .. } | Self::Sqlite(_) => false,
        }
    }
}
