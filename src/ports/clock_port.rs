//! Calendar access port trait.

use chrono::NaiveDate;

pub trait Clock: Send + Sync {
    /// The current calendar date; range windows end here.
    fn today(&self) -> NaiveDate;
}
