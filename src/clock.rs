use chrono::{DateTime, Datelike, TimeZone, Utc};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    /// Returns `None` for an impossible calendar date.
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn year(&self) -> i32 {
        self.0.year()
    }
    /// Approval dates are stored as `YYYY-MM-DD`.
    pub fn approval_date(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of "now" for id year scoping and approval dates.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeStamp<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp<Utc> {
        TimeStamp::new()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone)]
pub struct FixedClock(pub TimeStamp<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> TimeStamp<Utc> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_date_format() {
        let ts = TimeStamp::new_with(2017, 2, 1, 10, 30, 0).unwrap();
        assert_eq!(ts.approval_date(), "2017-02-01");
        assert_eq!(ts.year(), 2017);
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(TimeStamp::new_with(2017, 2, 30, 0, 0, 0).is_none());
    }

    #[test]
    fn fixed_clock_does_not_move() {
        let clock = FixedClock(TimeStamp::new_with(2024, 12, 31, 23, 59, 59).unwrap());
        assert_eq!(clock.now(), clock.now());
    }
}
