//! Timetable value types shared by the resolver and its callers.

use std::fmt::{self, Write as _};

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date literal format accepted from users, e.g. `31.10.2025`.
pub const DEFAULT_DATE_FORMAT: &str = "%d.%m.%Y";

/// One timetable slot. All fields are opaque display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub time: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub room: String,
    pub teacher: String,
}

/// Alternating-week classification relative to the term anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekParity {
    Odd,
    Even,
}

impl WeekParity {
    /// Parity of a 1-based week number. Zero and negative week numbers
    /// continue the alternation (week 0 is even, week -1 is odd).
    #[must_use]
    pub const fn from_week_number(week: i64) -> Self {
        if week.rem_euclid(2) == 1 {
            Self::Odd
        } else {
            Self::Even
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Odd => "odd",
            Self::Even => "even",
        }
    }

    /// Localized label used in rendered timetables.
    #[must_use]
    pub const fn label_ru(self) -> &'static str {
        match self {
            Self::Odd => "нечётная",
            Self::Even => "чётная",
        }
    }
}

impl fmt::Display for WeekParity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entries resolved for a single calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub parity: WeekParity,
    pub entries: Vec<ClassEntry>,
}

impl DaySchedule {
    #[must_use]
    pub fn is_day_off(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Date literals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date {input:?}; expected format {expected}")]
pub struct DateParseError {
    pub input: String,
    pub expected: String,
}

impl DateParseError {
    /// Example literal for the expected format, suitable for user hints.
    #[must_use]
    pub fn example(&self) -> String {
        let Some(sample) = NaiveDate::from_ymd_opt(2025, 10, 31) else {
            return self.expected.clone();
        };
        let mut out = String::new();
        // An unsupported specifier makes the formatter fail; fall back to the raw pattern.
        match write!(out, "{}", sample.format(&self.expected)) {
            Ok(()) => out,
            Err(_) => self.expected.clone(),
        }
    }
}

/// Parse a user-supplied date literal with a chrono format string.
pub fn parse_date_literal(input: &str, format: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(input.trim(), format).map_err(|_| DateParseError {
        input: input.to_string(),
        expected: format.to_string(),
    })
}

// ============================================================================
// Weekday names
// ============================================================================

const WEEKDAYS: [(Weekday, &str, &str); 7] = [
    (Weekday::Mon, "monday", "понедельник"),
    (Weekday::Tue, "tuesday", "вторник"),
    (Weekday::Wed, "wednesday", "среда"),
    (Weekday::Thu, "thursday", "четверг"),
    (Weekday::Fri, "friday", "пятница"),
    (Weekday::Sat, "saturday", "суббота"),
    (Weekday::Sun, "sunday", "воскресенье"),
];

/// Lowercase English name, as used for keys in the schedule document.
#[must_use]
pub fn weekday_name(day: Weekday) -> &'static str {
    WEEKDAYS[day.num_days_from_monday() as usize].1
}

#[must_use]
pub fn weekday_name_ru(day: Weekday) -> &'static str {
    WEEKDAYS[day.num_days_from_monday() as usize].2
}

/// Case-insensitive lookup of an English weekday name (`"Monday"`, `"friday"`).
#[must_use]
pub fn weekday_from_name(name: &str) -> Option<Weekday> {
    let name = name.trim().to_ascii_lowercase();
    WEEKDAYS
        .iter()
        .find(|(_, en, _)| *en == name)
        .map(|(day, _, _)| *day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_from_week_number_handles_non_positive_weeks() {
        assert_eq!(WeekParity::from_week_number(1), WeekParity::Odd);
        assert_eq!(WeekParity::from_week_number(2), WeekParity::Even);
        assert_eq!(WeekParity::from_week_number(0), WeekParity::Even);
        assert_eq!(WeekParity::from_week_number(-1), WeekParity::Odd);
        assert_eq!(WeekParity::from_week_number(-2), WeekParity::Even);
    }

    #[test]
    fn parse_date_literal_accepts_dotted_format() {
        let date = parse_date_literal("31.10.2025", DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 10, 31).unwrap());

        let padded = parse_date_literal("  01.09.2025 ", DEFAULT_DATE_FORMAT).unwrap();
        assert_eq!(padded, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
    }

    #[test]
    fn parse_date_literal_rejects_wrong_separator_and_garbage() {
        for bad in ["31-10-2025", "2025.10.31", "31.13.2025", "tomorrow", ""] {
            let err = parse_date_literal(bad, DEFAULT_DATE_FORMAT).unwrap_err();
            assert_eq!(err.input, bad);
            assert_eq!(err.expected, DEFAULT_DATE_FORMAT);
        }
    }

    #[test]
    fn parse_error_example_follows_format() {
        let err = parse_date_literal("x", DEFAULT_DATE_FORMAT).unwrap_err();
        assert_eq!(err.example(), "31.10.2025");
    }

    #[test]
    fn parse_error_example_survives_unsupported_specifier() {
        let err = parse_date_literal("31.10.2025", "%d.%m.%Q").unwrap_err();
        assert_eq!(err.example(), "%d.%m.%Q");
    }

    #[test]
    fn weekday_names_roundtrip() {
        for (day, en, _) in WEEKDAYS {
            assert_eq!(weekday_name(day), en);
            assert_eq!(weekday_from_name(en), Some(day));
        }
        assert_eq!(weekday_from_name("Friday"), Some(Weekday::Fri));
        assert_eq!(weekday_from_name("fri"), None);
        assert_eq!(weekday_name_ru(Weekday::Wed), "среда");
    }

    #[test]
    fn class_entry_uses_type_key_on_the_wire() {
        let json = r#"{"time":"9:00-10:30","subject":"Math","type":"Lecture","room":"101","teacher":"Ivanov"}"#;
        let entry: ClassEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.kind, "Lecture");
        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["type"], "Lecture");
    }
}
