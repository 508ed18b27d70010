use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleError};

/// Hour value meaning "active at 00" rather than "unused".
pub const HOUR_WILDCARD: u8 = 24;
/// Minute value meaning "active at 00" rather than "unused".
pub const MINUTE_WILDCARD: u8 = 60;
/// Second value meaning "active at 00" rather than "unused".
pub const SECOND_WILDCARD: u8 = 60;

/// Defines when a task fires.
///
/// The point families (`MonthlyDay`, `AnnualDayMonth`, `AnnualMonth`,
/// `DailyTime`) accept the wildcard-zero sentinels in their time fields:
/// hour 24 and minute/second 60 mean "this field is active at exactly
/// zero", which matters for [`Recurrence::DailyTime`]'s granularity choice
/// and renders as 00 everywhere else. The weekday and interval families are
/// strict and take no sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Every month on `day` at the given time-of-day, skipping months where
    /// the date does not exist (day 31 skips 30-day months, 29/30 skip
    /// February as needed).
    MonthlyDay {
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    },

    /// Once per year on a fixed (day, month). Pairs that exist in no year
    /// (e.g. 31/04) are rejected; 29/02 resolves to leap years only.
    AnnualDayMonth {
        day: u8,
        month: u8,
        hour: u8,
        minute: u8,
        second: u8,
    },

    /// Once per year on the 1st of `month` at the given time-of-day.
    AnnualMonth {
        month: u8,
        hour: u8,
        minute: u8,
        second: u8,
    },

    /// The indexed occurrence of `weekday` in the current month, where the
    /// index tracks today's occurrence index at evaluation time. `weekday`
    /// is 1–7 with 7 meaning Sunday.
    WeeklyWeekday {
        weekday: u8,
        hour: u8,
        minute: u8,
        second: u8,
    },

    /// Sub-day cadence at one of three granularities, chosen by the
    /// highest-order active field: hour set fires once per day, else minute
    /// set fires once per hour, else second set fires once per minute.
    DailyTime { hour: u8, minute: u8, second: u8 },

    /// Every fixed duration, re-armed from the actual fire instant; the
    /// interval never catches up after a stall.
    FixedInterval {
        days: u16,
        hours: u8,
        minutes: u8,
        seconds: u8,
    },
}

/// Fieldless discriminant of [`Recurrence`], for logging and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceKind {
    MonthlyDay,
    AnnualDayMonth,
    AnnualMonth,
    WeeklyWeekday,
    DailyTime,
    FixedInterval,
}

impl std::fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecurrenceKind::MonthlyDay => "monthly_day",
            RecurrenceKind::AnnualDayMonth => "annual_day_month",
            RecurrenceKind::AnnualMonth => "annual_month",
            RecurrenceKind::WeeklyWeekday => "weekly_weekday",
            RecurrenceKind::DailyTime => "daily_time",
            RecurrenceKind::FixedInterval => "fixed_interval",
        };
        write!(f, "{s}")
    }
}

impl Recurrence {
    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Recurrence::MonthlyDay { .. } => RecurrenceKind::MonthlyDay,
            Recurrence::AnnualDayMonth { .. } => RecurrenceKind::AnnualDayMonth,
            Recurrence::AnnualMonth { .. } => RecurrenceKind::AnnualMonth,
            Recurrence::WeeklyWeekday { .. } => RecurrenceKind::WeeklyWeekday,
            Recurrence::DailyTime { .. } => RecurrenceKind::DailyTime,
            Recurrence::FixedInterval { .. } => RecurrenceKind::FixedInterval,
        }
    }

    /// Check every field range before the rule is armed.
    ///
    /// Sentinel values pass for the point families; an all-zero
    /// `DailyTime` or `FixedInterval` is rejected as non-working because it
    /// could never fire.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Recurrence::MonthlyDay {
                day,
                hour,
                minute,
                second,
            } => {
                check_range("day", day, 1, 31)?;
                check_point_time(hour, minute, second)
            }
            Recurrence::AnnualDayMonth {
                day,
                month,
                hour,
                minute,
                second,
            } => {
                check_range("day", day, 1, 31)?;
                check_range("month", month, 1, 12)?;
                if day > max_month_day(month) {
                    return Err(RuleError::InvalidDate { day, month });
                }
                check_point_time(hour, minute, second)
            }
            Recurrence::AnnualMonth {
                month,
                hour,
                minute,
                second,
            } => {
                check_range("month", month, 1, 12)?;
                check_point_time(hour, minute, second)
            }
            Recurrence::WeeklyWeekday {
                weekday,
                hour,
                minute,
                second,
            } => {
                check_range("weekday", weekday, 1, 7)?;
                check_strict_time(hour, minute, second)
            }
            Recurrence::DailyTime {
                hour,
                minute,
                second,
            } => {
                check_point_time(hour, minute, second)?;
                if hour == 0 && minute == 0 && second == 0 {
                    return Err(RuleError::NonWorking);
                }
                Ok(())
            }
            Recurrence::FixedInterval {
                days,
                hours,
                minutes,
                seconds,
            } => {
                check_strict_time(hours, minutes, seconds)?;
                if days == 0 && hours == 0 && minutes == 0 && seconds == 0 {
                    return Err(RuleError::NonWorking);
                }
                Ok(())
            }
        }
    }
}

/// A recurrence plus the single-shot flag: one task's full firing
/// description. Parse from rule text with [`str::parse`]; `Display` renders
/// the canonical text form back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(flatten)]
    pub recurrence: Recurrence,
    /// When set, the task retires after its first fire.
    #[serde(default)]
    pub single: bool,
}

impl Rule {
    /// A rule that keeps firing on its cadence.
    pub fn repeating(recurrence: Recurrence) -> Self {
        Self {
            recurrence,
            single: false,
        }
    }

    /// A rule that fires once and retires.
    pub fn single_shot(recurrence: Recurrence) -> Self {
        Self {
            recurrence,
            single: true,
        }
    }

    pub fn kind(&self) -> RecurrenceKind {
        self.recurrence.kind()
    }
}

/// Map sentinel time fields to their effective zero values.
pub(crate) fn normalize_sentinels(hour: u8, minute: u8, second: u8) -> (u8, u8, u8) {
    (
        if hour == HOUR_WILDCARD { 0 } else { hour },
        if minute == MINUTE_WILDCARD { 0 } else { minute },
        if second == SECOND_WILDCARD { 0 } else { second },
    )
}

/// Largest day the month can hold in any year (February counts 29).
fn max_month_day(month: u8) -> u8 {
    match month {
        2 => 29,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn check_range(field: &'static str, value: u8, min: u8, max: u8) -> Result<()> {
    if value < min || value > max {
        return Err(RuleError::OutOfRange {
            field,
            value: u32::from(value),
        });
    }
    Ok(())
}

/// Point-family time fields: sentinels allowed.
fn check_point_time(hour: u8, minute: u8, second: u8) -> Result<()> {
    check_range("hour", hour, 0, HOUR_WILDCARD)?;
    check_range("minute", minute, 0, MINUTE_WILDCARD)?;
    check_range("second", second, 0, SECOND_WILDCARD)
}

/// Weekday/interval time fields: plain clock ranges, no sentinels.
pub(crate) fn check_strict_time(hour: u8, minute: u8, second: u8) -> Result<()> {
    check_range("hour", hour, 0, 23)?;
    check_range("minute", minute, 0, 59)?;
    check_range("second", second, 0, 59)
}
