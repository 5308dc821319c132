//! Core domain types for Wiseacre.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod credential;
mod ids;
mod schedule;

pub use credential::{
    AuthOutcome, AuthStatus, ClaimRecord, ClaimState, ClaimantLabel, CredentialRecord,
    CredentialToken, EmptyLabelError, TokenParseError,
};
pub use ids::RequesterId;
pub use schedule::{
    ClassEntry, DEFAULT_DATE_FORMAT, DateParseError, DaySchedule, WeekParity, parse_date_literal,
    weekday_from_name, weekday_name, weekday_name_ru,
};
