//! The armed task: a validated rule plus its cached deadline.

use chrono::NaiveDateTime;

use crate::deadline;
use crate::error::Result;
use crate::types::{RecurrenceKind, Rule};

/// A rule armed against a clock reading.
///
/// The deadline is the earliest qualifying instant strictly after the `now`
/// it was last computed from; it stays valid until the first `now` that
/// exceeds it, or until a recalculation is forced. All instants live in the
/// owning clock's shifted frame: arm a task with readings from the same
/// [`Clock`](crate::Clock) that later drives [`Task::is_due`].
#[derive(Debug, Clone)]
pub struct Task {
    rule: Rule,
    deadline: NaiveDateTime,
}

impl Task {
    /// Validate `rule` and arm it at `now`.
    pub fn new(rule: Rule, now: NaiveDateTime) -> Result<Self> {
        rule.recurrence.validate()?;
        Ok(Self {
            rule,
            deadline: deadline::arm(&rule.recurrence, now),
        })
    }

    /// Decode rule text and arm it at `now`.
    pub fn parse(text: &str, now: NaiveDateTime) -> Result<Self> {
        Self::new(text.parse()?, now)
    }

    /// Report whether the task fires at `now`, advancing the deadline on a
    /// fire.
    ///
    /// The comparison is strict: a `now` equal to the deadline is not yet
    /// due. With `recalc` set the deadline is recomputed relative to `now`
    /// and the call always reports `false`; hosts take that path after a
    /// system clock jump, so the task re-anchors without firing a storm of
    /// missed occurrences. Clock-change detection itself is the host's job.
    pub fn is_due(&mut self, now: NaiveDateTime, recalc: bool) -> bool {
        if now > self.deadline || recalc {
            self.deadline = deadline::rearm(&self.rule.recurrence, now);
            return !recalc;
        }
        false
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn kind(&self) -> RecurrenceKind {
        self.rule.kind()
    }

    /// Whether the task retires after its first fire.
    pub fn is_single(&self) -> bool {
        self.rule.single
    }

    /// The cached next-fire instant.
    pub fn deadline(&self) -> NaiveDateTime {
        self.deadline
    }
}
