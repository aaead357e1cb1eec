//! Time source injected into the tracker.

use chrono::{DateTime, Local, NaiveDate, Utc};

/// Supplies the current instant and the user's calendar day.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day used for streaks.
    fn today(&self) -> NaiveDate;
}

/// Wall clock. Days follow the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
