//! Schedule document loading.
//!
//! The document is JSON:
//!
//! ```json
//! {
//!   "start_date": "2025-09-01",
//!   "odd_week":  { "monday": [ { "time": "...", "subject": "...", "type": "...",
//!                                "room": "...", "teacher": "..." } ] },
//!   "even_week": { },
//!   "special_dates": { "2025-12-31": [] }
//! }
//! ```
//!
//! Parsing happens once at start-up. Any defect is a [`RepositoryLoadError`];
//! there is no partially-loaded document.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Weekday};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use wiseacre_types::{ClassEntry, WeekParity, weekday_from_name};

/// Anchor used when the document omits `start_date`.
pub const DEFAULT_START_DATE: &str = "2025-09-01";

const ISO_DATE: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum RepositoryLoadError {
    #[error("schedule document not found at {}", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read schedule document {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed schedule document {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid start_date {0:?}; expected YYYY-MM-DD")]
    InvalidStartDate(String),
    #[error("invalid special date {0:?}; expected YYYY-MM-DD")]
    InvalidSpecialDate(String),
    #[error("unknown weekday {key:?} in {week}")]
    UnknownWeekday { week: &'static str, key: String },
}

#[derive(Deserialize)]
struct RawScheduleDocument {
    start_date: Option<String>,
    #[serde(default)]
    odd_week: BTreeMap<String, Vec<ClassEntry>>,
    #[serde(default)]
    even_week: BTreeMap<String, Vec<ClassEntry>>,
    #[serde(default)]
    special_dates: BTreeMap<String, Vec<ClassEntry>>,
}

/// Weekday → ordered entries for one week parity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekTemplate {
    days: HashMap<Weekday, Vec<ClassEntry>>,
}

impl WeekTemplate {
    fn from_raw(
        week: &'static str,
        raw: BTreeMap<String, Vec<ClassEntry>>,
    ) -> Result<Self, RepositoryLoadError> {
        let mut days = HashMap::with_capacity(raw.len());
        for (key, entries) in raw {
            let day = weekday_from_name(&key)
                .ok_or_else(|| RepositoryLoadError::UnknownWeekday { week, key })?;
            days.insert(day, entries);
        }
        Ok(Self { days })
    }

    /// Entries for `day`, empty when the template has no key for it.
    #[must_use]
    pub fn entries(&self, day: Weekday) -> &[ClassEntry] {
        self.days.get(&day).map_or(&[], Vec::as_slice)
    }
}

/// Loaded timetable. Read-only for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDocument {
    start_date: NaiveDate,
    odd_week: WeekTemplate,
    even_week: WeekTemplate,
    special_dates: BTreeMap<NaiveDate, Vec<ClassEntry>>,
}

impl ScheduleDocument {
    pub fn from_json_str(json: &str) -> Result<Self, RepositoryLoadError> {
        Self::parse(json, "<inline>")
    }

    fn parse(json: &str, origin: &str) -> Result<Self, RepositoryLoadError> {
        let raw: RawScheduleDocument =
            serde_json::from_str(json).map_err(|source| RepositoryLoadError::Malformed {
                origin: origin.to_string(),
                source,
            })?;
        Self::try_from(raw)
    }

    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    #[must_use]
    pub fn template(&self, parity: WeekParity) -> &WeekTemplate {
        match parity {
            WeekParity::Odd => &self.odd_week,
            WeekParity::Even => &self.even_week,
        }
    }

    /// Override for an exact date, if one exists (possibly empty).
    #[must_use]
    pub fn exception(&self, date: NaiveDate) -> Option<&[ClassEntry]> {
        self.special_dates.get(&date).map(Vec::as_slice)
    }

    #[must_use]
    pub fn exception_count(&self) -> usize {
        self.special_dates.len()
    }
}

impl TryFrom<RawScheduleDocument> for ScheduleDocument {
    type Error = RepositoryLoadError;

    fn try_from(raw: RawScheduleDocument) -> Result<Self, Self::Error> {
        let start_literal = raw.start_date.unwrap_or_else(|| {
            warn!(default = DEFAULT_START_DATE, "Schedule has no start_date; using default anchor");
            DEFAULT_START_DATE.to_string()
        });
        let start_date = NaiveDate::parse_from_str(start_literal.trim(), ISO_DATE)
            .map_err(|_| RepositoryLoadError::InvalidStartDate(start_literal.clone()))?;

        let special_dates = raw
            .special_dates
            .into_iter()
            .map(|(key, entries)| {
                NaiveDate::parse_from_str(key.trim(), ISO_DATE)
                    .map(|date| (date, entries))
                    .map_err(|_| RepositoryLoadError::InvalidSpecialDate(key))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(Self {
            start_date,
            odd_week: WeekTemplate::from_raw("odd_week", raw.odd_week)?,
            even_week: WeekTemplate::from_raw("even_week", raw.even_week)?,
            special_dates,
        })
    }
}

/// File-backed source of the [`ScheduleDocument`].
#[derive(Debug, Clone)]
pub struct ScheduleRepository {
    path: PathBuf,
}

impl ScheduleRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<ScheduleDocument, RepositoryLoadError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                RepositoryLoadError::NotFound {
                    path: self.path.clone(),
                }
            } else {
                RepositoryLoadError::Read {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let document = ScheduleDocument::parse(&content, &self.path.display().to_string())?;
        info!(
            path = %self.path.display(),
            start_date = %document.start_date,
            exceptions = document.exception_count(),
            "Schedule loaded"
        );
        Ok(document)
    }
}
