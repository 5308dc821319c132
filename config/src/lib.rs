//! Configuration loading for Wiseacre.
//!
//! Raw TOML structs keep every field optional. [`WiseacreConfig::resolve`]
//! applies defaults and validation once, at the parse boundary, and hands out
//! [`Settings`] whose values need no further checking.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use thiserror::Error;
use wiseacre_types::DEFAULT_DATE_FORMAT;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "WISEACRE_CONFIG";

const DEFAULT_STORE_PATH: &str = "data/allowed_students.txt";
const DEFAULT_SQLITE_PATH: &str = "data/claims.db";
const DEFAULT_SCHEDULE_PATH: &str = "data/schedule.json";
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Invalid { .. } => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WiseacreConfig {
    pub storage: Option<StorageConfig>,
    pub schedule: Option<ScheduleConfig>,
    pub access: Option<AccessConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageConfig {
    pub backend: Option<StorageBackend>,
    /// Path of the credential file or database. `${VAR}` is expanded.
    pub path: Option<String>,
    /// Maximum wait for the store lock before reporting the store unavailable.
    pub lock_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleConfig {
    /// Path of the schedule JSON document. `${VAR}` is expanded.
    pub path: Option<String>,
    /// Fixed offset used to decide what "today" is. Default: +3 (Moscow).
    pub utc_offset_hours: Option<i32>,
    /// chrono format for user-supplied dates. Default: `%d.%m.%Y`.
    pub date_format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccessConfig {
    /// Refuse schedule queries from requesters that have not claimed a
    /// credential in this process. Default: true.
    #[serde(default = "default_true")]
    pub require_auth_for_schedule: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            require_auth_for_schedule: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    FlatFile,
    Sqlite,
    Memory,
}

impl StorageBackend {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FlatFile => "flat_file",
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }

    const fn default_path(self) -> &'static str {
        match self {
            Self::FlatFile | Self::Memory => DEFAULT_STORE_PATH,
            Self::Sqlite => DEFAULT_SQLITE_PATH,
        }
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub path: PathBuf,
    pub lock_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub path: PathBuf,
    pub utc_offset: FixedOffset,
    pub date_format: String,
}

/// Whether schedule answers require a successful claim first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    pub require_auth_for_schedule: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            require_auth_for_schedule: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub storage: StorageSettings,
    pub schedule: ScheduleSettings,
    pub access: AccessPolicy,
}

impl WiseacreConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    /// Load from an explicit path; the file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Apply defaults and validate.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let storage = self.storage.as_ref();
        let backend = storage.and_then(|s| s.backend).unwrap_or_default();
        let store_path = storage
            .and_then(|s| s.path.as_deref())
            .map_or_else(|| backend.default_path().to_string(), expand_env_vars);
        let lock_timeout_ms = storage
            .and_then(|s| s.lock_timeout_ms)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT_MS);
        if lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "storage.lock_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }

        let schedule = self.schedule.as_ref();
        let schedule_path = schedule
            .and_then(|s| s.path.as_deref())
            .map_or_else(|| DEFAULT_SCHEDULE_PATH.to_string(), expand_env_vars);
        let offset_hours = schedule
            .and_then(|s| s.utc_offset_hours)
            .unwrap_or(DEFAULT_UTC_OFFSET_HOURS);
        let utc_offset = if (-12..=14).contains(&offset_hours) {
            FixedOffset::east_opt(offset_hours * 3600)
        } else {
            None
        }
        .ok_or_else(|| ConfigError::Invalid {
            field: "schedule.utc_offset_hours",
            reason: format!("{offset_hours} is outside -12..=14"),
        })?;
        let date_format = schedule
            .and_then(|s| s.date_format.clone())
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
        if StrftimeItems::new(&date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid {
                field: "schedule.date_format",
                reason: format!("{date_format:?} is not a valid strftime pattern"),
            });
        }

        let access = AccessPolicy {
            require_auth_for_schedule: self
                .access
                .as_ref()
                .is_none_or(|a| a.require_auth_for_schedule),
        };

        Ok(Settings {
            storage: StorageSettings {
                backend,
                path: PathBuf::from(store_path),
                lock_timeout: Duration::from_millis(lock_timeout_ms),
            },
            schedule: ScheduleSettings {
                path: PathBuf::from(schedule_path),
                utc_offset,
                date_format,
            },
            access,
        })
    }
}

/// Expand `${VAR}` references; unset variables expand to nothing.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// `$WISEACRE_CONFIG` if set, else `~/.wiseacre/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(explicit) = env::var(CONFIG_ENV_VAR)
        && !explicit.trim().is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".wiseacre").join("config.toml"))
}
