use chrono::{FixedOffset, NaiveDate, Offset, Utc};

const DEFAULT_OFFSET_SECONDS: i32 = 3 * 3600;

/// Source of "today" for relative schedule queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock shifted by a fixed UTC offset.
    System(FixedOffset),
    /// Pinned date, for tests and for answering as of a given day.
    Fixed(NaiveDate),
}

impl Clock {
    #[must_use]
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self::System(offset)
    }

    #[must_use]
    pub fn fixed(date: NaiveDate) -> Self {
        Self::Fixed(date)
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System(offset) => Utc::now().with_timezone(offset).date_naive(),
            Self::Fixed(date) => *date,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::System(FixedOffset::east_opt(DEFAULT_OFFSET_SECONDS).unwrap_or(Utc.fix()))
    }
}
