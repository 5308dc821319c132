use std::collections::HashMap;

use wiseacre_types::{AuthOutcome, ClaimRecord, ClaimantLabel, CredentialToken};

use crate::{ClaimBackend, StoreError, StoreStats};

/// Non-durable backend. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: HashMap<CredentialToken, ClaimRecord>,
}

impl ClaimBackend for MemoryBackend {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn lookup(&mut self, token: &CredentialToken) -> Result<Option<ClaimRecord>, StoreError> {
        Ok(self.records.get(token).cloned())
    }

    fn insert_free(&mut self, token: &CredentialToken) -> Result<bool, StoreError> {
        if self.records.contains_key(token) {
            return Ok(false);
        }
        self.records.insert(token.clone(), ClaimRecord::Free);
        Ok(true)
    }

    fn claim(
        &mut self,
        token: &CredentialToken,
        claimant: &ClaimantLabel,
    ) -> Result<AuthOutcome, StoreError> {
        let Some(record) = self.records.get_mut(token) else {
            return Ok(AuthOutcome::NotFound);
        };
        if let ClaimRecord::Claimed { claimant: existing } = record {
            return Ok(AuthOutcome::AlreadyClaimed {
                claimant: existing.clone(),
            });
        }
        *record = ClaimRecord::claimed(claimant.clone());
        Ok(AuthOutcome::Granted)
    }

    fn stats(&mut self) -> Result<StoreStats, StoreError> {
        let free = self.records.values().filter(|r| r.is_free()).count();
        Ok(StoreStats {
            total: self.records.len() as u64,
            free: free as u64,
        })
    }
}
