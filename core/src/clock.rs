//! Wall clock used to stamp predictions and to define "today".
//!
//! The store owns a clock so `created_at` is always assigned server-side.
//! Tests drive a `ManualClock` to place records in specific hours.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Local>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self { current: Mutex::new(start) }
    }

    pub fn set(&self, at: DateTime<Local>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    /// Move forward by `step`. Returns the new time.
    pub fn advance(&self, step: Duration) -> DateTime<Local> {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + step;
        *guard
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Local midnight at the start of `day`.
/// Falls back to the earliest valid instant when midnight is skipped by DST.
pub fn start_of_day(day: NaiveDate) -> DateTime<Local> {
    let naive = day.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive).earliest() {
        Some(t) => t,
        None => Local.from_utc_datetime(&naive),
    }
}

/// Last representable instant of the local `day` (inclusive upper bound).
pub fn end_of_day(day: NaiveDate) -> DateTime<Local> {
    match day.succ_opt() {
        Some(next) => start_of_day(next) - Duration::milliseconds(1),
        None => start_of_day(day) + Duration::hours(24) - Duration::milliseconds(1),
    }
}
