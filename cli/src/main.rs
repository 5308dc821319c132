//! Wiseacre command-line entry point.

mod chat;
mod commands;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wiseacre_config::WiseacreConfig;

use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "wiseacre")]
#[command(about = "Credential-gated student timetable assistant")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Credential store path (overrides config)
    #[arg(long, env = "WISEACRE_STORE")]
    store: Option<PathBuf>,

    /// Schedule document path (overrides config)
    #[arg(long, env = "WISEACRE_SCHEDULE")]
    schedule: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // stdout carries command output; diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.wiseacre/logs/wiseacre.log
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".wiseacre").join("logs").join("wiseacre.log"));
    }

    // Fallback: ./.wiseacre/logs/wiseacre.log
    candidates.push(PathBuf::from(".wiseacre").join("logs").join("wiseacre.log"));

    candidates
}

fn load_config(explicit: Option<&PathBuf>) -> Result<WiseacreConfig> {
    match explicit {
        Some(path) => WiseacreConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(WiseacreConfig::load()
            .context("failed to load config")?
            .unwrap_or_default()),
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = load_config(cli.config.as_ref())?;
    let mut settings = config.resolve().context("invalid configuration")?;
    if let Some(store) = cli.store {
        settings.storage.path = store;
    }
    if let Some(schedule) = cli.schedule {
        settings.schedule.path = schedule;
    }
    tracing::debug!(?settings, "Settings resolved");

    let report = commands::run(cli.command, &settings)?;
    if !report.text.is_empty() {
        println!("{}", report.text);
    }
    Ok(report.success)
}
