//! Fixed-width rule text codec.
//!
//! Rules travel as compact fixed-format strings; every numeric field is
//! zero-padded decimal and every delimiter sits at a fixed byte position:
//!
//! | Form                | Length | Meaning                              |
//! |---------------------|--------|--------------------------------------|
//! | `P DD/MM hh:mm:ss`  | 16     | repeating point (day/month/time)     |
//! | `SP DD/MM hh:mm:ss` | 17     | single-shot point                    |
//! | `W D hh:mm:ss`      | 12     | repeating weekday point, D in 1–7    |
//! | `SW D hh:mm:ss`     | 13     | single-shot weekday point            |
//! | `I DDDDD hh:mm:ss`  | 16     | repeating interval, DDDDD days       |
//! | `SI DDDDD hh:mm:ss` | 17     | single-shot interval                 |
//!
//! Zero day/month/weekday fields select the less specific family: `P 05/00`
//! fires monthly, `P 00/11` yearly on the 1st, `P 00/00` daily or faster,
//! and `W 0` degrades to the time-only families. Decoding rejects wrong
//! lengths, wrong delimiter characters and non-digit slots before any range
//! validation runs.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RuleError};
use crate::types::{check_strict_time, normalize_sentinels, Recurrence, Rule};

impl FromStr for Rule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("P ") {
            check_len(s, 16)?;
            parse_point(s.as_bytes(), 0, false)
        } else if s.starts_with("SP ") {
            check_len(s, 17)?;
            parse_point(s.as_bytes(), 1, true)
        } else if s.starts_with("W ") {
            check_len(s, 12)?;
            parse_week(s.as_bytes(), 0, false)
        } else if s.starts_with("SW ") {
            check_len(s, 13)?;
            parse_week(s.as_bytes(), 1, true)
        } else if s.starts_with("I ") {
            check_len(s, 16)?;
            parse_interval(s.as_bytes(), 0, false)
        } else if s.starts_with("SI ") {
            check_len(s, 17)?;
            parse_interval(s.as_bytes(), 1, true)
        } else {
            Err(RuleError::UnknownFormat)
        }
    }
}

impl fmt::Display for Rule {
    /// Render the canonical text form.
    ///
    /// Sentinel time fields normalize to `00` in the point families where
    /// they change nothing; `DailyTime` keeps them raw because they select
    /// the cadence (`24` in the hour slot is not the same rule as `00`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.single {
            f.write_str("S")?;
        }
        match self.recurrence {
            Recurrence::MonthlyDay {
                day,
                hour,
                minute,
                second,
            } => {
                let (h, m, s) = normalize_sentinels(hour, minute, second);
                write!(f, "P {day:02}/00 {h:02}:{m:02}:{s:02}")
            }
            Recurrence::AnnualDayMonth {
                day,
                month,
                hour,
                minute,
                second,
            } => {
                let (h, m, s) = normalize_sentinels(hour, minute, second);
                write!(f, "P {day:02}/{month:02} {h:02}:{m:02}:{s:02}")
            }
            Recurrence::AnnualMonth {
                month,
                hour,
                minute,
                second,
            } => {
                let (h, m, s) = normalize_sentinels(hour, minute, second);
                write!(f, "P 00/{month:02} {h:02}:{m:02}:{s:02}")
            }
            Recurrence::WeeklyWeekday {
                weekday,
                hour,
                minute,
                second,
            } => write!(f, "W {weekday} {hour:02}:{minute:02}:{second:02}"),
            Recurrence::DailyTime {
                hour,
                minute,
                second,
            } => write!(f, "P 00/00 {hour:02}:{minute:02}:{second:02}"),
            Recurrence::FixedInterval {
                days,
                hours,
                minutes,
                seconds,
            } => write!(f, "I {days:05} {hours:02}:{minutes:02}:{seconds:02}"),
        }
    }
}

/// Body of `P DD/MM hh:mm:ss`; `off` is 1 when the single-shot prefix
/// shifts every position right by one.
fn parse_point(b: &[u8], off: usize, single: bool) -> Result<Rule> {
    delimiter(b, 4 + off, b'/')?;
    delimiter(b, 7 + off, b' ')?;
    delimiter(b, 10 + off, b':')?;
    delimiter(b, 13 + off, b':')?;

    let day = two_digits(b, 2 + off)?;
    let month = two_digits(b, 5 + off)?;
    let hour = two_digits(b, 8 + off)?;
    let minute = two_digits(b, 11 + off)?;
    let second = two_digits(b, 14 + off)?;

    let recurrence = if day > 0 && month > 0 {
        Recurrence::AnnualDayMonth {
            day,
            month,
            hour,
            minute,
            second,
        }
    } else if day > 0 {
        Recurrence::MonthlyDay {
            day,
            hour,
            minute,
            second,
        }
    } else if month > 0 {
        Recurrence::AnnualMonth {
            month,
            hour,
            minute,
            second,
        }
    } else {
        Recurrence::DailyTime {
            hour,
            minute,
            second,
        }
    };
    recurrence.validate()?;
    Ok(Rule { recurrence, single })
}

/// Body of `W D hh:mm:ss`.
fn parse_week(b: &[u8], off: usize, single: bool) -> Result<Rule> {
    delimiter(b, 3 + off, b' ')?;
    delimiter(b, 6 + off, b':')?;
    delimiter(b, 9 + off, b':')?;

    let weekday = digit(b, 2 + off)?;
    let hour = two_digits(b, 4 + off)?;
    let minute = two_digits(b, 7 + off)?;
    let second = two_digits(b, 10 + off)?;

    // The weekday family takes no sentinels, even on the daily fallthrough.
    check_strict_time(hour, minute, second)?;

    let recurrence = if weekday > 0 {
        Recurrence::WeeklyWeekday {
            weekday,
            hour,
            minute,
            second,
        }
    } else {
        Recurrence::DailyTime {
            hour,
            minute,
            second,
        }
    };
    recurrence.validate()?;
    Ok(Rule { recurrence, single })
}

/// Body of `I DDDDD hh:mm:ss`.
fn parse_interval(b: &[u8], off: usize, single: bool) -> Result<Rule> {
    delimiter(b, 7 + off, b' ')?;
    delimiter(b, 10 + off, b':')?;
    delimiter(b, 13 + off, b':')?;

    let days = five_digits(b, 2 + off)?;
    let hours = two_digits(b, 8 + off)?;
    let minutes = two_digits(b, 11 + off)?;
    let seconds = two_digits(b, 14 + off)?;

    if days > u32::from(u16::MAX) {
        return Err(RuleError::OutOfRange {
            field: "days",
            value: days,
        });
    }

    let recurrence = Recurrence::FixedInterval {
        days: days as u16,
        hours,
        minutes,
        seconds,
    };
    recurrence.validate()?;
    Ok(Rule { recurrence, single })
}

fn check_len(s: &str, expected: usize) -> Result<()> {
    if s.len() != expected {
        return Err(RuleError::Length {
            expected,
            got: s.len(),
        });
    }
    Ok(())
}

fn delimiter(b: &[u8], pos: usize, expected: u8) -> Result<()> {
    if b[pos] != expected {
        return Err(RuleError::Delimiter { pos });
    }
    Ok(())
}

fn digit(b: &[u8], pos: usize) -> Result<u8> {
    if !b[pos].is_ascii_digit() {
        return Err(RuleError::Digit { pos });
    }
    Ok(b[pos] - b'0')
}

fn two_digits(b: &[u8], pos: usize) -> Result<u8> {
    Ok(digit(b, pos)? * 10 + digit(b, pos + 1)?)
}

fn five_digits(b: &[u8], pos: usize) -> Result<u32> {
    let mut value = 0u32;
    for i in 0..5 {
        value = value * 10 + u32::from(digit(b, pos + i)?);
    }
    Ok(value)
}
