//! Wall-clock [`Clock`] using the local calendar date.

use crate::ports::clock_port::Clock;
use chrono::{Local, NaiveDate};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
