//! Access gate between a transport and the two core subsystems.
//!
//! ```text
//! transport ──► AccessGate ──► ClaimStore        (credential claims)
//!                    │
//!                    └───────► ScheduleResolver  (date → entries)
//! ```
//!
//! The gate remembers which requesters claimed a credential in this process
//! and applies [`AccessPolicy`] before answering schedule queries.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};
use wiseacre_config::AccessPolicy;
use wiseacre_schedule::{RelativeDay, ScheduleResolver};
use wiseacre_store::{ClaimStore, StoreError};
use wiseacre_types::{AuthOutcome, ClaimantLabel, DateParseError, RequesterId};

use crate::clock::Clock;
use crate::replies;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("requester {0} has not authenticated")]
    NotAuthenticated(RequesterId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Date(#[from] DateParseError),
    #[error("no calendar day follows {0}")]
    OutOfRange(NaiveDate),
}

/// What a requester asked the schedule for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleQuery {
    Today,
    Tomorrow,
    Week,
    /// A literal in the resolver's date format.
    Date(String),
}

impl ScheduleQuery {
    /// Keywords are matched case-insensitively in English and Russian;
    /// anything else is treated as a date literal.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "today" | "сегодня" => Self::Today,
            "tomorrow" | "завтра" => Self::Tomorrow,
            "week" | "неделя" => Self::Week,
            _ => Self::Date(trimmed.to_string()),
        }
    }
}

pub struct AccessGate {
    store: Arc<ClaimStore>,
    resolver: Arc<ScheduleResolver>,
    clock: Clock,
    policy: AccessPolicy,
    sessions: RwLock<HashMap<RequesterId, ClaimantLabel>>,
}

impl AccessGate {
    pub fn new(store: Arc<ClaimStore>, resolver: Arc<ScheduleResolver>, policy: AccessPolicy) -> Self {
        Self {
            store,
            resolver,
            clock: Clock::default(),
            policy,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn store(&self) -> &ClaimStore {
        &self.store
    }

    #[must_use]
    pub fn resolver(&self) -> &ScheduleResolver {
        &self.resolver
    }

    #[must_use]
    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Label stored with a claim: `<name> [<id>]` when the display name has
    /// content, otherwise `user_<id>`. Both forms embed the requester id, so
    /// two requesters never share a label.
    #[must_use]
    pub fn claimant_label(requester: RequesterId, display_name: Option<&str>) -> ClaimantLabel {
        display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .and_then(|name| ClaimantLabel::new(format!("{name} [{requester}]")).ok())
            .unwrap_or_else(|| ClaimantLabel::for_requester(requester))
    }

    /// Present a raw credential on behalf of `requester`.
    ///
    /// A credential already held under this requester's own label counts as
    /// granted, so a requester can sign in again after a restart.
    pub fn submit_credential(
        &self,
        requester: RequesterId,
        display_name: Option<&str>,
        raw_id: &str,
    ) -> Result<AuthOutcome, GateError> {
        let label = Self::claimant_label(requester, display_name);
        let outcome = match self.store.authenticate(raw_id, &label)? {
            AuthOutcome::AlreadyClaimed {
                claimant: Some(holder),
            } if holder == label => {
                info!(%requester, claimant = %label, "Holder signed in again");
                AuthOutcome::Granted
            }
            other => other,
        };

        if outcome.is_success() {
            self.sessions_mut().insert(requester, label);
        }
        Ok(outcome)
    }

    #[must_use]
    pub fn is_authenticated(&self, requester: RequesterId) -> bool {
        self.sessions_ref().contains_key(&requester)
    }

    /// Forget the session. The store claim is irreversible and stays.
    pub fn sign_out(&self, requester: RequesterId) -> bool {
        self.sessions_mut().remove(&requester).is_some()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions_ref().len()
    }

    /// Rendered schedule text for `query`, subject to the access policy.
    pub fn schedule(
        &self,
        requester: RequesterId,
        query: &ScheduleQuery,
    ) -> Result<String, GateError> {
        if self.policy.require_auth_for_schedule && !self.is_authenticated(requester) {
            debug!(%requester, "Schedule query refused: not authenticated");
            return Err(GateError::NotAuthenticated(requester));
        }

        let today = self.clock.today();
        let resolver = &self.resolver;
        let day = match query {
            ScheduleQuery::Today => resolver
                .resolve_relative(today, RelativeDay::Today)
                .ok_or(GateError::OutOfRange(today))?,
            ScheduleQuery::Tomorrow => resolver
                .resolve_relative(today, RelativeDay::Tomorrow)
                .ok_or(GateError::OutOfRange(today))?,
            ScheduleQuery::Week => {
                let days = resolver.week_overview(today);
                return Ok(resolver.format_week_overview(&days));
            }
            ScheduleQuery::Date(literal) => resolver.resolve_by_literal(literal)?,
        };
        Ok(resolver.format_for_display(day.date, &day.entries))
    }

    /// [`AccessGate::submit_credential`] rendered as a reply.
    #[must_use]
    pub fn reply_to_credential(
        &self,
        requester: RequesterId,
        display_name: Option<&str>,
        raw_id: &str,
    ) -> String {
        match self.submit_credential(requester, display_name, raw_id) {
            Ok(outcome) => replies::for_outcome(&outcome),
            Err(err) => reply_for_error(&err),
        }
    }

    /// [`AccessGate::schedule`] rendered as a reply, parsing `input` first.
    #[must_use]
    pub fn reply_to_schedule(&self, requester: RequesterId, input: &str) -> String {
        self.schedule(requester, &ScheduleQuery::parse(input))
            .unwrap_or_else(|err| reply_for_error(&err))
    }

    fn sessions_ref(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<RequesterId, ClaimantLabel>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions_mut(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<RequesterId, ClaimantLabel>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn reply_for_error(err: &GateError) -> String {
    match err {
        GateError::NotAuthenticated(_) => replies::not_authenticated(),
        GateError::Store(err) => {
            tracing::warn!(error = %err, "Credential store unavailable");
            replies::store_unavailable(err)
        }
        GateError::Date(err) => replies::invalid_date(err),
        GateError::OutOfRange(_) => replies::tomorrow_unavailable(),
    }
}
