//! `metronome-core` — the recurrence engine behind the metronome scheduler.
//!
//! # Overview
//!
//! A [`Rule`] describes when a task fires: one of six recurrence families
//! plus a single-shot flag, decoded from a compact fixed-width text form
//! (see [`format`]). A [`Task`] arms a rule against a reading from a
//! [`Clock`] and then answers "is it due?" for later readings, advancing
//! its cached deadline each time it fires. The registry and poll loop that
//! drive tasks live in `metronome-scheduler`; this crate is pure
//! computation and never blocks.
//!
//! # Recurrence families
//!
//! | Variant          | Text form           | Behaviour                           |
//! |------------------|---------------------|-------------------------------------|
//! | `MonthlyDay`     | `P DD/00 hh:mm:ss`  | Monthly on a day, skipping months where the date does not exist |
//! | `AnnualDayMonth` | `P DD/MM hh:mm:ss`  | Yearly on a fixed date (Feb 29 waits for leap years) |
//! | `AnnualMonth`    | `P 00/MM hh:mm:ss`  | Yearly on the 1st of a month        |
//! | `WeeklyWeekday`  | `W D hh:mm:ss`      | This week's occurrence of a weekday, else next week |
//! | `DailyTime`      | `P 00/00 hh:mm:ss`  | Daily, hourly or per-minute, by the highest active field |
//! | `FixedInterval`  | `I DDDDD hh:mm:ss`  | Every fixed duration from the last fire |
//!
//! Hour `24` and minute/second `60` are wildcard-zero sentinels in the `P`
//! families: the field counts as active but contributes zero, which is how
//! "daily at midnight" (`P 00/00 24:00:00`) stays distinguishable from the
//! rejected all-zero rule.
//!
//! All calendar math happens on naive date-times shifted by the clock's
//! fixed UTC offset; there is no timezone database and no daylight-saving
//! handling.

pub mod clock;
pub mod deadline;
pub mod error;
pub mod format;
pub mod task;
pub mod types;

pub use clock::Clock;
pub use error::{Result, RuleError};
pub use task::Task;
pub use types::{Recurrence, RecurrenceKind, Rule};
pub use types::{HOUR_WILDCARD, MINUTE_WILDCARD, SECOND_WILDCARD};
