use chrono::{Duration, NaiveDateTime, Utc};

/// Time source with a fixed UTC offset applied to every reading.
///
/// All scheduling math happens in the shifted naive frame this clock
/// produces. The offset is injected at construction rather than read from
/// the host system, so tests and embedders control it deterministically.
/// Daylight-saving transitions are not tracked: the offset stays fixed for
/// the clock's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset_secs: i32,
}

impl Clock {
    /// Clock reporting plain UTC.
    pub fn utc() -> Self {
        Self { offset_secs: 0 }
    }

    /// Clock shifted by a fixed offset in seconds, positive east of UTC.
    pub fn with_offset(offset_secs: i32) -> Self {
        Self { offset_secs }
    }

    /// Current instant in the shifted frame.
    pub fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::seconds(i64::from(self.offset_secs))
    }

    pub fn offset_secs(&self) -> i32 {
        self.offset_secs
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_shifts_the_reading() {
        let utc = Clock::utc();
        let shifted = Clock::with_offset(3600);
        let delta = shifted.now() - utc.now();
        // Both readings happen within the same second or so.
        assert!((3599..=3601).contains(&delta.num_seconds()));
        assert_eq!(shifted.offset_secs(), 3600);
    }

    #[test]
    fn negative_offsets_go_west() {
        let utc = Clock::utc();
        let shifted = Clock::with_offset(-7200);
        let delta = utc.now() - shifted.now();
        assert!((7199..=7201).contains(&delta.num_seconds()));
    }
}
