//! Core request handling for Wiseacre.
//!
//! This crate wires the credential store and the schedule resolver behind an
//! [`AccessGate`], decides what "today" means via [`Clock`], and renders
//! every user-facing reply.

#![allow(clippy::missing_errors_doc)]

mod clock;
mod gate;
pub mod replies;

pub use clock::Clock;
pub use gate::{AccessGate, GateError, ScheduleQuery};
pub use wiseacre_config::AccessPolicy;
