//! Schedule loading, resolution, and the gate on top of it.

use std::fs;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use wiseacre_core::{AccessGate, AccessPolicy, Clock, GateError, ScheduleQuery};
use wiseacre_schedule::{RepositoryLoadError, ScheduleRepository, ScheduleResolver};
use wiseacre_store::{ClaimStore, FlatFileBackend};
use wiseacre_types::{RequesterId, WeekParity};

use crate::common::Fixture;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn resolver(fx: &Fixture) -> ScheduleResolver {
    ScheduleResolver::new(ScheduleRepository::new(fx.schedule_path()).load().unwrap())
}

#[test]
fn parity_scenarios_from_file() {
    let fx = Fixture::new();
    let r = resolver(&fx);
    assert_eq!(r.week_parity(date(2025, 9, 1)), WeekParity::Odd);
    assert_eq!(r.week_parity(date(2025, 9, 8)), WeekParity::Even);
    assert_eq!(r.week_parity(date(2025, 8, 25)), WeekParity::Even);

    let start = date(2024, 1, 1);
    for offset in 0..800 {
        let d = start + Duration::days(offset);
        assert_eq!(r.week_parity(d), r.week_parity(d + Duration::days(14)));
    }
}

#[test]
fn exceptions_replace_template_verbatim() {
    let fx = Fixture::new();
    let r = resolver(&fx);

    let nye = r.resolve_day(date(2025, 12, 31));
    assert!(nye.is_empty());
    assert!(r.document().exception(date(2025, 12, 31)).is_some());

    // A Tuesday has no template key at all: also empty, but not an exception.
    assert!(r.resolve_day(date(2025, 9, 2)).is_empty());
    assert!(r.document().exception(date(2025, 9, 2)).is_none());

    let open_day = r.resolve_day(date(2025, 9, 3));
    assert_eq!(open_day.len(), 1);
    assert_eq!(open_day[0].subject, "День открытых дверей");
}

#[test]
fn literal_dates_and_rendering() {
    let fx = Fixture::new();
    let r = resolver(&fx);

    assert!(r.resolve_by_literal("31-10-2025").is_err());

    let day = r.resolve_by_literal("01.09.2025").unwrap();
    let text = r.format_for_display(day.date, &day.entries);
    assert!(text.starts_with("📅 Расписание на 01.09.2025 (понедельник)\n🗓 нечётная неделя\n\n"));
    assert_eq!(text.matches("━━━━━━━━━━━━━━━━━━━━").count(), 1);
    let analysis = text.find("Математический анализ").unwrap();
    let physics = text.find("Физика").unwrap();
    assert!(analysis < physics);

    let off = r.resolve_by_literal("31.12.2025").unwrap();
    let text = r.format_for_display(off.date, &off.entries);
    assert_eq!(text, "📅 31.12.2025 (среда)\nПар нет 🎉\n(чётная неделя)");
}

#[test]
fn broken_documents_fail_to_load() {
    let fx = Fixture::new();
    fs::write(fx.schedule_path(), r#"{"odd_week": {"monday": [{"time": "09:00"}]}}"#).unwrap();
    assert!(matches!(
        ScheduleRepository::new(fx.schedule_path()).load(),
        Err(RepositoryLoadError::Malformed { .. })
    ));

    assert!(matches!(
        ScheduleRepository::new(fx.root().join("nope.json")).load(),
        Err(RepositoryLoadError::NotFound { .. })
    ));
}

#[test]
fn gate_over_file_backed_store() {
    let fx = Fixture::new();
    let store = ClaimStore::new(FlatFileBackend::new(fx.store_path()));
    store.provision("12345").unwrap();

    let gate = AccessGate::new(Arc::new(store), Arc::new(resolver(&fx)), AccessPolicy::default())
        .with_clock(Clock::fixed(date(2025, 9, 5)));
    let alice = RequesterId::new(10);

    assert!(matches!(
        gate.schedule(alice, &ScheduleQuery::Week),
        Err(GateError::NotAuthenticated(_))
    ));

    assert!(gate.submit_credential(alice, Some("alice"), "12345").unwrap().is_success());
    let week = gate.schedule(alice, &ScheduleQuery::Week).unwrap();
    assert!(week.contains("01.09.2025 (понедельник)"));
    assert!(week.contains("День открытых дверей"));
    assert!(!week.contains("(пятница)"));

    // Saturday follows the Friday the clock is pinned to.
    let tomorrow = gate.schedule(alice, &ScheduleQuery::Tomorrow).unwrap();
    assert!(tomorrow.contains("06.09.2025 (суббота)"));
    assert!(tomorrow.contains("Пар нет"));
}
