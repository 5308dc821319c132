//! Credential identity types.
//!
//! A raw student credential never leaves the hasher: everything downstream
//! (storage, logs, disclosure) sees only the [`CredentialToken`].

use std::fmt;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::RequesterId;

// ============================================================================
// Credential Token (Identity Hasher)
// ============================================================================

/// One-way digest of a normalized credential identifier.
///
/// Invariant: exactly 64 lowercase hexadecimal characters (SHA-256).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialToken(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenParseError {
    #[error("credential token must be {expected} hex characters (got {actual})")]
    Length { expected: usize, actual: usize },
    #[error("credential token contains non-hex character {0:?}")]
    NonHex(char),
}

impl CredentialToken {
    pub const HEX_LEN: usize = 64;

    /// Hash a raw credential string.
    ///
    /// Leading and trailing whitespace is stripped first, so `" 12345\n"` and
    /// `"12345"` map to the same token.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        let digest = Sha256::digest(raw.trim().as_bytes());
        // Manual hex encoding to avoid hex crate dependency
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    /// Parse a token previously produced by [`CredentialToken::from_raw`].
    ///
    /// Uppercase hex is accepted and normalized to lowercase.
    pub fn parse(hex: &str) -> Result<Self, TokenParseError> {
        let hex = hex.trim();
        let actual = hex.chars().count();
        if actual != Self::HEX_LEN {
            return Err(TokenParseError::Length {
                expected: Self::HEX_LEN,
                actual,
            });
        }
        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(TokenParseError::NonHex(bad));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines. Never log the full token.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CredentialToken {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for CredentialToken {
    type Error = TokenParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CredentialToken> for String {
    fn from(value: CredentialToken) -> Self {
        value.0
    }
}

// ============================================================================
// Claimant Label
// ============================================================================

/// Display label of the requester who claimed a credential.
///
/// Invariant: non-empty after trimming; stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClaimantLabel(String);

#[derive(Debug, Error)]
#[error("claimant label must not be empty")]
pub struct EmptyLabelError;

impl ClaimantLabel {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyLabelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Err(EmptyLabelError)
        } else if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Fallback label for a requester with no usable display name.
    #[must_use]
    pub fn for_requester(requester: RequesterId) -> Self {
        Self(format!("user_{requester}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ClaimantLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClaimantLabel {
    type Error = EmptyLabelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ClaimantLabel {
    type Error = EmptyLabelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClaimantLabel> for String {
    fn from(value: ClaimantLabel) -> Self {
        value.0
    }
}

// ============================================================================
// Claim Records
// ============================================================================

/// Occupancy of a credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimState {
    Free,
    Claimed,
}

impl ClaimState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Claimed => "claimed",
        }
    }
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State half of a credential record.
///
/// A claimed record normally carries its claimant. Records written by older
/// tooling may be claimed without one, so the claimant stays optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRecord {
    Free,
    Claimed { claimant: Option<ClaimantLabel> },
}

impl ClaimRecord {
    #[must_use]
    pub fn claimed(claimant: ClaimantLabel) -> Self {
        Self::Claimed {
            claimant: Some(claimant),
        }
    }

    #[must_use]
    pub const fn state(&self) -> ClaimState {
        match self {
            Self::Free => ClaimState::Free,
            Self::Claimed { .. } => ClaimState::Claimed,
        }
    }

    #[must_use]
    pub fn claimant(&self) -> Option<&ClaimantLabel> {
        match self {
            Self::Free => None,
            Self::Claimed { claimant } => claimant.as_ref(),
        }
    }

    #[must_use]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }
}

/// A credential token together with its claim state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub token: CredentialToken,
    pub claim: ClaimRecord,
}

impl CredentialRecord {
    #[must_use]
    pub fn free(token: CredentialToken) -> Self {
        Self {
            token,
            claim: ClaimRecord::Free,
        }
    }
}

// ============================================================================
// Authentication Outcome
// ============================================================================

/// Result of a single authentication attempt.
///
/// `NotFound` and `AlreadyClaimed` are ordinary outcomes, not errors: the
/// caller turns them into user-facing replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The credential was free and is now bound to the requester.
    Granted,
    /// No record exists for the credential.
    NotFound,
    /// The credential is already bound; `claimant` is disclosed to the caller.
    AlreadyClaimed { claimant: Option<ClaimantLabel> },
}

/// Flat status code of an [`AuthOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthStatus {
    Ok,
    NotFound,
    AlreadyClaimed,
}

impl AuthOutcome {
    #[must_use]
    pub const fn status(&self) -> AuthStatus {
        match self {
            Self::Granted => AuthStatus::Ok,
            Self::NotFound => AuthStatus::NotFound,
            Self::AlreadyClaimed { .. } => AuthStatus::AlreadyClaimed,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// The existing claimant, when the credential was already taken.
    #[must_use]
    pub fn existing_claimant(&self) -> Option<&ClaimantLabel> {
        match self {
            Self::AlreadyClaimed { claimant } => claimant.as_ref(),
            _ => None,
        }
    }
}
