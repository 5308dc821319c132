//! Text rendering of resolved days.

use chrono::{Datelike, NaiveDate};
use wiseacre_types::{ClassEntry, DaySchedule, WeekParity, weekday_name_ru};

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━";
const HEADER_DATE_FORMAT: &str = "%d.%m.%Y";

/// Render one day: header with date, weekday, and parity, then each entry's
/// fields in fixed order (time, subject, type, room, teacher).
#[must_use]
pub fn render_day(date: NaiveDate, parity: WeekParity, entries: &[ClassEntry]) -> String {
    let date_label = format!(
        "{} ({})",
        date.format(HEADER_DATE_FORMAT),
        weekday_name_ru(date.weekday())
    );
    let parity_label = parity.label_ru();

    if entries.is_empty() {
        return format!("📅 {date_label}\nПар нет 🎉\n({parity_label} неделя)");
    }

    let mut msg = format!("📅 Расписание на {date_label}\n🗓 {parity_label} неделя\n\n");
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            msg.push_str(DIVIDER);
            msg.push('\n');
        }
        msg.push_str(&format!(
            "🕒 {}\n📘 {}\n🎓 {}\n🏫 {}\n👨‍🏫 {}\n",
            entry.time, entry.subject, entry.kind, entry.room, entry.teacher
        ));
    }
    msg
}

/// Render several days one after another; an empty slice gets its own
/// message.
#[must_use]
pub fn render_week(days: &[DaySchedule]) -> String {
    if days.is_empty() {
        return "На этой неделе пар нет 🎉".to_string();
    }
    days.iter()
        .map(|day| render_day(day.date, day.parity, &day.entries))
        .collect::<Vec<_>>()
        .join("\n")
}
