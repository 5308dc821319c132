use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use wiseacre_config::{AccessPolicy, Settings, StorageBackend};
use wiseacre_core::{AccessGate, Clock, ScheduleQuery};
use wiseacre_schedule::{ScheduleRepository, ScheduleResolver};
use wiseacre_store::{ClaimStore, FlatFileBackend, SqliteBackend};
use wiseacre_types::{AuthOutcome, ClaimantLabel, RequesterId};

use crate::chat::ChatSession;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision every non-blank line of FILE as a free credential
    Provision { file: PathBuf },
    /// Provision a single credential
    Add { id: String },
    /// Report whether a credential is provisioned
    Check { id: String },
    /// Claim a credential on behalf of LABEL
    Claim {
        id: String,
        #[arg(long = "as", value_name = "LABEL")]
        label: String,
    },
    /// Show credential counts
    Stats,
    /// Print the schedule: today, tomorrow, week, or a date literal
    Schedule {
        #[arg(default_value = "today")]
        query: String,
    },
    /// Load the schedule document and probe the credential store
    Validate,
    /// Converse on stdin/stdout as one requester, through the access gate
    Chat {
        #[arg(long, default_value_t = 1)]
        requester: i64,
        /// Display name stored with a successful claim
        #[arg(long)]
        name: Option<String>,
    },
}

/// Text to print and whether the command achieved what was asked.
pub struct Report {
    pub text: String,
    pub success: bool,
}

impl Report {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: true,
        }
    }

    fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            success: false,
        }
    }
}

pub fn run(command: Command, settings: &Settings) -> Result<Report> {
    match command {
        Command::Provision { file } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("failed to read credential list {}", file.display()))?;
            let report = open_store(settings)?.provision_many(content.lines())?;
            Ok(Report::ok(format!(
                "added: {}\nskipped: {}",
                report.added, report.skipped
            )))
        }
        Command::Add { id } => {
            if open_store(settings)?.provision(&id)? {
                Ok(Report::ok("added"))
            } else {
                Ok(Report::ok("already provisioned"))
            }
        }
        Command::Check { id } => {
            if open_store(settings)?.exists(&id)? {
                Ok(Report::ok("provisioned"))
            } else {
                Ok(Report::failed("not provisioned"))
            }
        }
        Command::Claim { id, label } => {
            let label = ClaimantLabel::new(label).context("--as needs a non-empty label")?;
            let outcome = open_store(settings)?.authenticate(&id, &label)?;
            Ok(match outcome {
                AuthOutcome::Granted => Report::ok(format!("claimed by {label}")),
                AuthOutcome::NotFound => Report::failed("not found"),
                AuthOutcome::AlreadyClaimed { claimant } => Report::failed(format!(
                    "already claimed by {}",
                    claimant.as_ref().map_or("<unknown>", ClaimantLabel::as_str)
                )),
            })
        }
        Command::Stats => {
            let stats = open_store(settings)?.stats()?;
            Ok(Report::ok(format!(
                "total: {}\nfree: {}\nclaimed: {}",
                stats.total,
                stats.free,
                stats.claimed()
            )))
        }
        Command::Schedule { query } => {
            // Operators read the timetable without claiming a credential.
            let gate = AccessGate::new(
                Arc::new(ClaimStore::in_memory()),
                Arc::new(load_resolver(settings)?),
                AccessPolicy {
                    require_auth_for_schedule: false,
                },
            )
            .with_clock(Clock::with_offset(settings.schedule.utc_offset));
            let text = gate.schedule(RequesterId::new(0), &ScheduleQuery::parse(&query))?;
            Ok(Report::ok(text))
        }
        Command::Validate => {
            let resolver = load_resolver(settings)?;
            let stats = open_store(settings)?.stats()?;
            let document = resolver.document();
            Ok(Report::ok(format!(
                "schedule: {} (start {}, {} exception dates)\nstore: {} {} ({} credentials, {} free)",
                settings.schedule.path.display(),
                document.start_date(),
                document.exception_count(),
                settings.storage.backend.as_str(),
                settings.storage.path.display(),
                stats.total,
                stats.free
            )))
        }
        Command::Chat { requester, name } => {
            let gate = AccessGate::new(
                Arc::new(open_store(settings)?),
                Arc::new(load_resolver(settings)?),
                settings.access,
            )
            .with_clock(Clock::with_offset(settings.schedule.utc_offset));
            ChatSession::new(&gate, RequesterId::new(requester), name)
                .run(io::stdin().lock(), io::stdout().lock())?;
            Ok(Report::ok(""))
        }
    }
}

pub fn open_store(settings: &Settings) -> Result<ClaimStore> {
    let storage = &settings.storage;
    let store = match storage.backend {
        StorageBackend::FlatFile => ClaimStore::new(FlatFileBackend::new(&storage.path)),
        StorageBackend::Sqlite => {
            let backend = SqliteBackend::open(&storage.path, storage.lock_timeout)
                .with_context(|| format!("failed to open {}", storage.path.display()))?;
            ClaimStore::new(backend)
        }
        StorageBackend::Memory => ClaimStore::in_memory(),
    };
    Ok(store.with_lock_timeout(storage.lock_timeout))
}

pub fn load_resolver(settings: &Settings) -> Result<ScheduleResolver> {
    let document = ScheduleRepository::new(&settings.schedule.path)
        .load()
        .context("failed to load schedule")?;
    Ok(ScheduleResolver::new(document).with_date_format(settings.schedule.date_format.clone()))
}
