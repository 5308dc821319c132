use chrono::{Datelike, Days, NaiveDate};
use wiseacre_types::{
    ClassEntry, DEFAULT_DATE_FORMAT, DateParseError, DaySchedule, WeekParity, parse_date_literal,
};

use crate::display::{render_day, render_week};
use crate::repository::ScheduleDocument;

/// Day relative to "today" in the service's time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeDay {
    Today,
    Tomorrow,
}

impl RelativeDay {
    /// `None` only at the edge of the representable calendar.
    #[must_use]
    pub fn date_from(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Today => Some(today),
            Self::Tomorrow => today.succ_opt(),
        }
    }
}

/// Read-only view answering "what is on this date?".
#[derive(Debug, Clone)]
pub struct ScheduleResolver {
    document: ScheduleDocument,
    date_format: String,
}

impl ScheduleResolver {
    #[must_use]
    pub fn new(document: ScheduleDocument) -> Self {
        Self {
            document,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Override the chrono format used by [`ScheduleResolver::resolve_by_literal`].
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    #[must_use]
    pub fn document(&self) -> &ScheduleDocument {
        &self.document
    }

    #[must_use]
    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// 1-based week index relative to the anchor.
    ///
    /// Uses floor division, so dates before the anchor land in week 0, -1, ...
    /// and every week spans exactly seven days. Truncating division would
    /// merge the six days before the anchor into week 1.
    #[must_use]
    pub fn week_number(&self, date: NaiveDate) -> i64 {
        let delta_days = date
            .signed_duration_since(self.document.start_date())
            .num_days();
        delta_days.div_euclid(7) + 1
    }

    #[must_use]
    pub fn week_parity(&self, date: NaiveDate) -> WeekParity {
        WeekParity::from_week_number(self.week_number(date))
    }

    /// Entries for `date`: an exact exception wins (even when empty), then
    /// the template for the date's parity and weekday, then nothing.
    #[must_use]
    pub fn resolve_day(&self, date: NaiveDate) -> &[ClassEntry] {
        if let Some(entries) = self.document.exception(date) {
            return entries;
        }
        self.document
            .template(self.week_parity(date))
            .entries(date.weekday())
    }

    #[must_use]
    pub fn resolve(&self, date: NaiveDate) -> DaySchedule {
        DaySchedule {
            date,
            parity: self.week_parity(date),
            entries: self.resolve_day(date).to_vec(),
        }
    }

    pub fn resolve_by_literal(&self, literal: &str) -> Result<DaySchedule, DateParseError> {
        self.resolve_by_literal_with_format(literal, &self.date_format)
    }

    pub fn resolve_by_literal_with_format(
        &self,
        literal: &str,
        format: &str,
    ) -> Result<DaySchedule, DateParseError> {
        let date = parse_date_literal(literal, format)?;
        Ok(self.resolve(date))
    }

    #[must_use]
    pub fn resolve_relative(&self, today: NaiveDate, day: RelativeDay) -> Option<DaySchedule> {
        day.date_from(today).map(|date| self.resolve(date))
    }

    /// Monday-to-Friday of the week containing `today`, skipping days
    /// without sessions.
    #[must_use]
    pub fn week_overview(&self, today: NaiveDate) -> Vec<DaySchedule> {
        let back = u64::from(today.weekday().num_days_from_monday());
        let Some(monday) = today.checked_sub_days(Days::new(back)) else {
            return Vec::new();
        };
        (0..5)
            .filter_map(|offset| monday.checked_add_days(Days::new(offset)))
            .map(|date| self.resolve(date))
            .filter(|day| !day.is_day_off())
            .collect()
    }

    #[must_use]
    pub fn format_for_display(&self, date: NaiveDate, entries: &[ClassEntry]) -> String {
        render_day(date, self.week_parity(date), entries)
    }

    #[must_use]
    pub fn format_week_overview(&self, days: &[DaySchedule]) -> String {
        render_week(days)
    }
}
