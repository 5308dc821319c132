//! Shared infrastructure utilities for Wiseacre.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename) and
//!   durable line appends for the flat-file claim store.

pub mod atomic_write;

pub use atomic_write::{
    AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, PersistMode, append_line,
    atomic_write_with_options, recover_bak_file,
};
