//! Time source used by services and the session token codec.
//!
//! # Responsibility
//! - Give every time-dependent decision (age, registration date, creation
//!   timestamp, token expiry) one injectable source.
//!
//! # Invariants
//! - `FixedClock` never advances; tests rely on that for exact ages.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Wall-clock abstraction.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Clock backed by the operating system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Builds a clock at noon UTC of the given day.
    ///
    /// Returns `None` for an invalid calendar date.
    pub fn on_date(year: i32, month: u32, day: u32) -> Option<Self> {
        let now = Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).single()?;
        Some(Self { now })
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Milliseconds since the Unix epoch for `instant`.
pub fn epoch_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::{epoch_millis, Clock, FixedClock};
    use chrono::NaiveDate;

    #[test]
    fn fixed_clock_reports_its_day() {
        let clock = FixedClock::on_date(2024, 1, 15).expect("valid date");
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date")
        );
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn fixed_clock_rejects_impossible_dates() {
        assert!(FixedClock::on_date(2024, 2, 30).is_none());
    }

    #[test]
    fn epoch_millis_matches_chrono() {
        let clock = FixedClock::on_date(1970, 1, 1).expect("valid date");
        assert_eq!(epoch_millis(clock.now()), 12 * 60 * 60 * 1000);
    }
}
