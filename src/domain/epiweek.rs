//! Epidemiological (MMWR) weeks
//!
//! Weeks start on Sunday and week 1 is the week containing 4 January, so the
//! first days of January may belong to the last week of the previous year.

use chrono::{Datelike, Duration, NaiveDate};
use std::fmt;

/// Epidemiological week of a given year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Epiweek {
    pub year: i32,
    pub week: u32,
}

impl Epiweek {
    /// Epiweek containing `date`
    ///
    /// `None` when the week boundaries fall outside the representable
    /// calendar, which only happens at the extremes of `NaiveDate`.
    pub fn from_date(date: NaiveDate) -> Option<Self> {
        let mut year = date.year();
        let mut start = year_start(year)?;
        if date < start {
            year -= 1;
            start = year_start(year)?;
        } else {
            let next = year_start(year.checked_add(1)?)?;
            if date >= next {
                year += 1;
                start = next;
            }
        }
        let week = ((date - start).num_days() / 7) as u32 + 1;
        Some(Self { year, week })
    }

    /// Compact `YYYYWW` form
    pub fn as_code(&self) -> i32 {
        self.year * 100 + self.week as i32
    }
}

impl fmt::Display for Epiweek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.year, self.week)
    }
}

/// Sunday opening epidemiological week 1 of `year`
fn year_start(year: i32) -> Option<NaiveDate> {
    let jan4 = NaiveDate::from_ymd_opt(year, 1, 4)?;
    jan4.checked_sub_signed(Duration::days(i64::from(jan4.weekday().num_days_from_sunday())))
}
