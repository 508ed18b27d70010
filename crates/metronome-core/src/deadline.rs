//! Per-kind deadline computation.
//!
//! [`arm`] computes the first deadline for a freshly validated recurrence:
//! the earliest qualifying instant tracked from `now`, advanced one period
//! when the natural candidate has already passed. [`rearm`] computes the
//! deadline after a fire (or a forced recalculation) at `now`; most kinds
//! step straight into the next period rather than re-searching the current
//! one. Both run on naive date-times in the clock's shifted frame.
//!
//! Every path is total for a validated recurrence: the calendar searches
//! skip impossible dates (day 31 in a 30-day month, Feb 29 outside leap
//! years) and always land, since December holds every day up to 31 and a
//! leap year is never more than eight years out.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::types::{normalize_sentinels, Recurrence};

/// First deadline for a validated recurrence, relative to `now`.
pub fn arm(recurrence: &Recurrence, now: NaiveDateTime) -> NaiveDateTime {
    match *recurrence {
        Recurrence::MonthlyDay {
            day,
            hour,
            minute,
            second,
        } => {
            let offset = point_offset(hour, minute, second);
            let candidate = monthly_candidate(now.year(), now.month(), day) + offset;
            if now > candidate {
                // A passed candidate always sits in the current month.
                monthly_candidate(candidate.year(), candidate.month() + 1, day) + offset
            } else {
                candidate
            }
        }

        Recurrence::AnnualDayMonth {
            day,
            month,
            hour,
            minute,
            second,
        } => {
            let offset = point_offset(hour, minute, second);
            let candidate = annual_candidate(now.year(), month, day) + offset;
            if now > candidate {
                annual_candidate(candidate.year() + 1, month, day) + offset
            } else {
                candidate
            }
        }

        Recurrence::AnnualMonth {
            month,
            hour,
            minute,
            second,
        } => {
            let offset = point_offset(hour, minute, second);
            let candidate = month_start(now.year(), u32::from(month)) + offset;
            if now > candidate {
                month_start(now.year() + 1, u32::from(month)) + offset
            } else {
                candidate
            }
        }

        Recurrence::WeeklyWeekday {
            weekday,
            hour,
            minute,
            second,
        } => weekday_deadline(weekday, now, time_offset(hour, minute, second)),

        Recurrence::DailyTime {
            hour,
            minute,
            second,
        } => {
            let (h, m, s) = normalize_sentinels(hour, minute, second);
            // Granularity follows the highest-order active raw field; the
            // sentinels count as active while contributing zero.
            if hour > 0 {
                let candidate = day_start(now) + time_offset(h, m, s);
                if now > candidate {
                    candidate + Duration::days(1)
                } else {
                    candidate
                }
            } else if minute > 0 {
                let candidate = hour_start(now) + time_offset(0, m, s);
                if now > candidate {
                    candidate + Duration::hours(1)
                } else {
                    candidate
                }
            } else {
                let candidate = minute_start(now) + Duration::seconds(i64::from(s));
                if now > candidate {
                    candidate + Duration::minutes(1)
                } else {
                    candidate
                }
            }
        }

        Recurrence::FixedInterval {
            days,
            hours,
            minutes,
            seconds,
        } => now + interval_duration(days, hours, minutes, seconds),
    }
}

/// Deadline after a fire or a forced recalculation at `now`.
///
/// The point kinds advance one period past `now` without revisiting the
/// period the fire happened in; the weekday kind repeats the arming search
/// (its period is the occurrence index, which `now` already carries); the
/// interval kind re-arms from the actual fire instant, so intervals drift
/// rather than catch up after a stall.
pub fn rearm(recurrence: &Recurrence, now: NaiveDateTime) -> NaiveDateTime {
    match *recurrence {
        Recurrence::MonthlyDay {
            day,
            hour,
            minute,
            second,
        } => {
            monthly_candidate(now.year(), now.month() + 1, day)
                + point_offset(hour, minute, second)
        }

        Recurrence::AnnualDayMonth {
            day,
            month,
            hour,
            minute,
            second,
        } => annual_candidate(now.year() + 1, month, day) + point_offset(hour, minute, second),

        Recurrence::AnnualMonth {
            month,
            hour,
            minute,
            second,
        } => month_start(now.year() + 1, u32::from(month)) + point_offset(hour, minute, second),

        Recurrence::WeeklyWeekday {
            weekday,
            hour,
            minute,
            second,
        } => weekday_deadline(weekday, now, time_offset(hour, minute, second)),

        Recurrence::DailyTime {
            hour,
            minute,
            second,
        } => {
            let (h, m, s) = normalize_sentinels(hour, minute, second);
            if hour > 0 {
                day_start(now) + Duration::days(1) + time_offset(h, m, s)
            } else if minute > 0 {
                hour_start(now) + Duration::hours(1) + time_offset(0, m, s)
            } else {
                minute_start(now) + Duration::minutes(1) + Duration::seconds(i64::from(s))
            }
        }

        Recurrence::FixedInterval {
            days,
            hours,
            minutes,
            seconds,
        } => now + interval_duration(days, hours, minutes, seconds),
    }
}

// ---------------------------------------------------------------------------
// Calendar searches
// ---------------------------------------------------------------------------

/// Midnight of the first month >= `month` in which `day` exists, rolling
/// past December into January of the next year.
fn monthly_candidate(year: i32, month: u32, day: u8) -> NaiveDateTime {
    let (year, mut month) = if month > 12 { (year + 1, 1) } else { (year, month) };
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, u32::from(day)) {
            return date.and_time(NaiveTime::MIN);
        }
        // December holds day 31, so the search never leaves the year.
        month += 1;
    }
}

/// Midnight of (day, month) in the first year >= `year` where the date
/// exists. Only Feb 29 ever advances the year.
fn annual_candidate(year: i32, month: u8, day: u8) -> NaiveDateTime {
    let mut year = year;
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day)) {
            return date.and_time(NaiveTime::MIN);
        }
        year += 1;
    }
}

/// Midnight of the 1st of the month.
fn month_start(year: i32, month: u32) -> NaiveDateTime {
    monthly_candidate(year, month, 1)
}

/// Shared arm/rearm step for the weekday kind: the `index`-th occurrence of
/// the target weekday in the current month, where `index` is the occurrence
/// index of *today's* weekday, stepping to `index + 1` once passed. Indexes
/// beyond the month's last occurrence resolve a week at a time into the
/// following month.
fn weekday_deadline(weekday: u8, now: NaiveDateTime, offset: Duration) -> NaiveDateTime {
    let index = (now.day() - 1) / 7 + 1;
    let candidate = indexed_weekday(now.year(), now.month(), weekday, index) + offset;
    if now > candidate {
        indexed_weekday(now.year(), now.month(), weekday, index + 1) + offset
    } else {
        candidate
    }
}

/// Midnight of the `index`-th occurrence of `weekday` (1–7, 7 = Sunday)
/// within (`year`, `month`): first occurrence plus `index - 1` weeks.
fn indexed_weekday(year: i32, month: u32, weekday: u8, index: u32) -> NaiveDateTime {
    let start = month_start(year, month);
    let first_dow = start.weekday().num_days_from_monday();
    let target_dow = u32::from(weekday) - 1;
    let to_first = (target_dow + 7 - first_dow) % 7;
    start + Duration::days(i64::from(to_first) + 7 * (i64::from(index) - 1))
}

// ---------------------------------------------------------------------------
// Instant helpers
// ---------------------------------------------------------------------------

fn day_start(now: NaiveDateTime) -> NaiveDateTime {
    now.date().and_time(NaiveTime::MIN)
}

fn hour_start(now: NaiveDateTime) -> NaiveDateTime {
    day_start(now) + Duration::hours(i64::from(now.hour()))
}

fn minute_start(now: NaiveDateTime) -> NaiveDateTime {
    hour_start(now) + Duration::minutes(i64::from(now.minute()))
}

fn time_offset(hour: u8, minute: u8, second: u8) -> Duration {
    Duration::hours(i64::from(hour))
        + Duration::minutes(i64::from(minute))
        + Duration::seconds(i64::from(second))
}

/// Time-of-day offset for the point kinds, sentinels mapped to zero.
fn point_offset(hour: u8, minute: u8, second: u8) -> Duration {
    let (h, m, s) = normalize_sentinels(hour, minute, second);
    time_offset(h, m, s)
}

fn interval_duration(days: u16, hours: u8, minutes: u8, seconds: u8) -> Duration {
    Duration::days(i64::from(days)) + time_offset(hours, minutes, seconds)
}
