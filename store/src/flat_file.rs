//! Line-oriented credential file, one record per line:
//!
//! ```text
//! <64 hex token>:<state>[@<claimant>]
//! ```
//!
//! `state` is written as `свободен` / `занят`, the words used by the existing
//! provisioning tooling; `free` / `claimed` are accepted on read. The
//! claimant is percent-escaped so it can never contain a raw `:`, `@`, `%`,
//! or line break.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use wiseacre_types::{AuthOutcome, ClaimRecord, ClaimantLabel, CredentialRecord, CredentialToken};
use wiseacre_utils::{AtomicWriteOptions, append_line, atomic_write_with_options, recover_bak_file};

use crate::secure_fs::ensure_parent_dir;
use crate::{ClaimBackend, StoreError, StoreStats};

const FREE_WORD: &str = "свободен";
const CLAIMED_WORD: &str = "занят";

/// Credential store kept in a plain text file.
///
/// Every operation re-reads the file so out-of-band provisioning is picked
/// up immediately. Claims rewrite the whole file through a temp file and
/// rename.
pub struct FlatFileBackend {
    path: PathBuf,
    write_options: AtomicWriteOptions,
}

impl FlatFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        recover_bak_file(&path);
        Self {
            path,
            write_options: AtomicWriteOptions::default(),
        }
    }

    pub fn with_write_options(mut self, options: AtomicWriteOptions) -> Self {
        self.write_options = options;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records. `None` when the file does not exist yet.
    fn read_records(&self) -> Result<Option<Vec<CredentialRecord>>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let corrupt = |reason: String| StoreError::Corrupt {
                location: format!("{}:{}", self.path.display(), idx + 1),
                reason,
            };
            let record = decode_record(line).map_err(corrupt)?;
            if !seen.insert(record.token.clone()) {
                return Err(corrupt(format!("duplicate token {}", record.token.short())));
            }
            records.push(record);
        }
        Ok(Some(records))
    }

    fn write_records(&self, records: &[CredentialRecord]) -> Result<(), StoreError> {
        let mut out = String::with_capacity(records.len() * 80);
        for record in records {
            out.push_str(&encode_record(record));
            out.push('\n');
        }
        atomic_write_with_options(&self.path, out.as_bytes(), self.write_options)
            .map_err(|e| StoreError::io(&self.path, e))
    }
}

impl ClaimBackend for FlatFileBackend {
    fn describe(&self) -> String {
        format!("flat file {}", self.path.display())
    }

    fn lookup(&mut self, token: &CredentialToken) -> Result<Option<ClaimRecord>, StoreError> {
        Ok(self
            .read_records()?
            .unwrap_or_default()
            .into_iter()
            .find(|record| &record.token == token)
            .map(|record| record.claim))
    }

    fn insert_free(&mut self, token: &CredentialToken) -> Result<bool, StoreError> {
        let records = self.read_records()?.unwrap_or_default();
        if records.iter().any(|record| &record.token == token) {
            return Ok(false);
        }
        ensure_parent_dir(&self.path)?;
        let line = encode_record(&CredentialRecord::free(token.clone()));
        append_line(&self.path, &line, self.write_options)
            .map_err(|e| StoreError::io(&self.path, e))?;
        Ok(true)
    }

    fn insert_many(&mut self, tokens: &[CredentialToken]) -> Result<u64, StoreError> {
        let mut records = self.read_records()?.unwrap_or_default();
        let known: HashSet<CredentialToken> =
            records.iter().map(|record| record.token.clone()).collect();
        let before = records.len();
        records.extend(
            tokens
                .iter()
                .filter(|token| !known.contains(*token))
                .cloned()
                .map(CredentialRecord::free),
        );
        let added = (records.len() - before) as u64;
        if added > 0 {
            ensure_parent_dir(&self.path)?;
            self.write_records(&records)?;
        }
        Ok(added)
    }

    fn claim(
        &mut self,
        token: &CredentialToken,
        claimant: &ClaimantLabel,
    ) -> Result<AuthOutcome, StoreError> {
        let Some(mut records) = self.read_records()? else {
            return Err(StoreError::Missing {
                path: self.path.clone(),
            });
        };

        let Some(record) = records.iter_mut().find(|record| &record.token == token) else {
            return Ok(AuthOutcome::NotFound);
        };

        if let ClaimRecord::Claimed { claimant: existing } = &record.claim {
            return Ok(AuthOutcome::AlreadyClaimed {
                claimant: existing.clone(),
            });
        }

        record.claim = ClaimRecord::claimed(claimant.clone());
        self.write_records(&records)?;
        debug!(path = %self.path.display(), records = records.len(), "Rewrote credential file");
        Ok(AuthOutcome::Granted)
    }

    fn stats(&mut self) -> Result<StoreStats, StoreError> {
        let records = self.read_records()?.unwrap_or_default();
        let free = records.iter().filter(|record| record.claim.is_free()).count();
        Ok(StoreStats {
            total: records.len() as u64,
            free: free as u64,
        })
    }
}

// ============================================================================
// Line codec
// ============================================================================

pub(crate) fn encode_record(record: &CredentialRecord) -> String {
    match &record.claim {
        ClaimRecord::Free => format!("{}:{}", record.token, FREE_WORD),
        ClaimRecord::Claimed { claimant: None } => format!("{}:{}", record.token, CLAIMED_WORD),
        ClaimRecord::Claimed {
            claimant: Some(label),
        } => format!(
            "{}:{}@{}",
            record.token,
            CLAIMED_WORD,
            escape_label(label.as_str())
        ),
    }
}

pub(crate) fn decode_record(line: &str) -> Result<CredentialRecord, String> {
    let line = line.trim();
    let (token, rest) = line
        .split_once(':')
        .ok_or_else(|| "missing ':' separator".to_string())?;
    let token = CredentialToken::parse(token).map_err(|e| e.to_string())?;

    let (state, claimant) = match rest.split_once('@') {
        Some((state, claimant)) => (state, Some(claimant)),
        None => (rest, None),
    };

    let claim = match state.trim() {
        FREE_WORD | "free" => {
            if claimant.is_some() {
                return Err("free record must not carry a claimant".to_string());
            }
            ClaimRecord::Free
        }
        CLAIMED_WORD | "claimed" => ClaimRecord::Claimed {
            claimant: claimant
                .map(unescape_label)
                .and_then(|label| ClaimantLabel::new(label).ok()),
        },
        other => return Err(format!("unknown state {other:?}")),
    };

    Ok(CredentialRecord { token, claim })
}

fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '@' => out.push_str("%40"),
            '\n' => out.push_str("%0A"),
            '\r' => out.push_str("%0D"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape_label`]. Unknown `%` sequences are kept literally.
fn unescape_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos..];
        let decoded = after.get(1..3).and_then(|code| {
            match code.to_ascii_uppercase().as_str() {
                "25" => Some('%'),
                "3A" => Some(':'),
                "40" => Some('@'),
                "0A" => Some('\n'),
                "0D" => Some('\r'),
                _ => None,
            }
        });
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &after[3..];
            }
            None => {
                out.push('%');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiseacre_utils::{FileSyncPolicy, ParentDirSyncPolicy, PersistMode};

    use super::*;
    use crate::ClaimStore;
    use crate::tests::{exercise_contract, exercise_single_claim_race};

    const FAST: AtomicWriteOptions = AtomicWriteOptions {
        file_sync: FileSyncPolicy::SkipSync,
        parent_dir_sync: ParentDirSyncPolicy::SkipSync,
        mode: PersistMode::Default,
    };

    fn store_at(path: &Path) -> ClaimStore {
        ClaimStore::new(FlatFileBackend::new(path).with_write_options(FAST))
    }

    fn token(raw: &str) -> CredentialToken {
        CredentialToken::from_raw(raw)
    }

    #[test]
    fn flat_file_contract() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data").join("allowed_students.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "").unwrap();
        exercise_contract(&store_at(&path));
    }

    #[test]
    fn flat_file_single_claim_race() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_at(&dir.path().join("claims.txt"));
        exercise_single_claim_race(Arc::new(store));
    }

    #[test]
    fn missing_file_semantics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.txt");
        let store = store_at(&path);

        assert!(!store.exists("12345").unwrap());
        assert_eq!(store.stats().unwrap(), StoreStats::default());

        let err = store
            .authenticate("12345", &ClaimantLabel::new("alice").unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
        assert!(!path.exists(), "authenticate must not create the file");
    }

    #[test]
    fn persisted_layout_matches_line_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims.txt");
        let store = store_at(&path);

        store.provision("111").unwrap();
        store.provision("222").unwrap();
        store
            .authenticate("222", &ClaimantLabel::new("@student:one").unwrap())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{}:свободен", token("111")));
        assert_eq!(lines[1], format!("{}:занят@%40student%3Aone", token("222")));

        // Re-open from disk and confirm the claimant survives escaping.
        let reopened = store_at(&path);
        let outcome = reopened
            .authenticate("222", &ClaimantLabel::new("bob").unwrap())
            .unwrap();
        assert_eq!(
            outcome.existing_claimant().map(ClaimantLabel::as_str),
            Some("@student:one")
        );
    }

    #[test]
    fn reads_legacy_records_without_claimant() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims.txt");
        fs::write(
            &path,
            format!("{}:занят\n\n{}:free\n", token("old"), token("new")),
        )
        .unwrap();
        let store = store_at(&path);

        let outcome = store
            .authenticate("old", &ClaimantLabel::new("alice").unwrap())
            .unwrap();
        assert_eq!(outcome, AuthOutcome::AlreadyClaimed { claimant: None });
        assert_eq!(store.stats().unwrap(), StoreStats { total: 2, free: 1 });

        let granted = store
            .authenticate("new", &ClaimantLabel::new("alice").unwrap())
            .unwrap();
        assert!(granted.is_success());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(&format!("{}:занят@alice", token("new"))));
    }

    #[test]
    fn corrupt_lines_are_reported_with_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims.txt");
        fs::write(&path, format!("{}:свободен\nnot-a-record\n", token("1"))).unwrap();
        let store = store_at(&path);

        match store.stats().unwrap_err() {
            StoreError::Corrupt { location, .. } => assert!(location.ends_with(":2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_tokens_are_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims.txt");
        let line = format!("{}:свободен", token("1"));
        fs::write(&path, format!("{line}\n{line}\n")).unwrap();

        let err = store_at(&path).exists("1").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn bulk_provision_rewrites_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("claims.txt");
        let store = store_at(&path);
        store.provision("1").unwrap();

        let report = store.provision_many(["1", "2", "3"]).unwrap();
        assert_eq!(report.added, 2);
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 3);
    }

    #[test]
    fn codec_rejects_free_with_claimant_and_unknown_state() {
        let t = token("x");
        assert!(decode_record(&format!("{t}:свободен@alice")).is_err());
        assert!(decode_record(&format!("{t}:maybe")).is_err());
        assert!(decode_record("short:free").is_err());
    }

    #[test]
    fn unescape_keeps_unknown_sequences() {
        assert_eq!(unescape_label("100%"), "100%");
        assert_eq!(unescape_label("a%zzb"), "a%zzb");
        assert_eq!(unescape_label("%25%3a%40"), "%:@");
        assert_eq!(unescape_label(&escape_label("x:y@z%\n")), "x:y@z%\n");
    }
}
