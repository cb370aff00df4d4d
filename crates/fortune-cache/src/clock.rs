//! Clock seam for timestamps and "today" resolution

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};
use fortune_core::FortuneConfig;
use parking_lot::Mutex;
use std::fmt;

/// Source of the current instant and the caller's calendar date
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Offset the calendar date is resolved in
    fn offset(&self) -> FixedOffset;

    /// Calendar date of `now()` in the clock's offset
    fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset()).date_naive()
    }
}

fn offset_hours(hours: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(hours.checked_mul(3600)?)
}

/// Wall clock with a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Create clock resolving dates in `offset`
    #[inline]
    #[must_use]
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Create clock from `utc_offset_hours`; out-of-range offsets fall back to UTC
    #[must_use]
    pub fn from_config(config: &FortuneConfig) -> Self {
        Self::new(offset_hours(config.utc_offset_hours).unwrap_or_else(utc))
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::from_config(&FortuneConfig::default())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    offset: FixedOffset,
}

impl FixedClock {
    /// Create clock frozen at `now` (UTC dates)
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
            offset: utc(),
        }
    }

    /// Create clock frozen at noon UTC on `date`
    #[must_use]
    pub fn at_date(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap_or_default();
        Self::new(Utc.from_utc_datetime(&noon))
    }

    /// With offset for date resolution
    #[inline]
    #[must_use]
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Jump to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }

    fn offset(&self) -> FixedOffset {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn today_respects_offset() {
        // 2024-01-09 20:00 UTC is already 2024-01-10 in UTC+9.
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 9, 20, 0, 0).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        let clock = clock.with_offset(offset_hours(9).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let clock = FixedClock::at_date(date);
        let before = clock.now();
        assert_eq!(clock.now(), before);
        clock.advance(Duration::days(1));
        assert_eq!(clock.today(), date.succ_opt().unwrap());
        clock.set(before);
        assert_eq!(clock.today(), date);
    }

    #[test]
    fn system_clock_uses_configured_offset() {
        let clock = SystemClock::from_config(&FortuneConfig::default());
        assert_eq!(clock.offset().local_minus_utc(), 9 * 3600);
        let bogus = FortuneConfig {
            utc_offset_hours: 99,
            ..FortuneConfig::default()
        };
        assert_eq!(SystemClock::from_config(&bogus).offset().local_minus_utc(), 0);
    }
}
