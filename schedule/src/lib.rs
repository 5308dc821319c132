//! Timetable resolution.
//!
//! ```text
//! schedule.json ──load──> ScheduleDocument (immutable)
//!                              │
//!                  ScheduleResolver (Sync, no locking)
//!                  ├── week_parity(date)      anchor-relative, floor division
//!                  ├── resolve_day(date)      exception > template > empty
//!                  └── format_for_display()   localized text block
//! ```

mod display;
mod repository;
mod resolver;

pub use display::{render_day, render_week};
pub use repository::{
    DEFAULT_START_DATE, RepositoryLoadError, ScheduleDocument, ScheduleRepository, WeekTemplate,
};
pub use resolver::{RelativeDay, ScheduleResolver};
