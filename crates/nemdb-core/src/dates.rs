use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};

use crate::error::{NemdbError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive date window a populate run covers, written
/// `YYYY-MM-DD->YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(NemdbError::Config(format!(
                "date range ends ({end}) before it starts ({start})"
            )));
        }
        Ok(DateRange { start, end })
    }

    /// First-of-month dates falling inside the range. A mid-month start
    /// rolls forward to the next month, matching a month-start frequency.
    pub fn month_starts(&self) -> Vec<(i32, u32)> {
        let mut months = Vec::new();
        let mut cursor = first_of_month(self.start);
        if cursor < self.start {
            let Some(next) = cursor.checked_add_months(Months::new(1)) else {
                return months;
            };
            cursor = next;
        }
        while cursor <= self.end {
            months.push((cursor.year(), cursor.month()));
            match cursor.checked_add_months(Months::new(1)) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        months
    }

    /// Distinct years covered by [`Self::month_starts`].
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.month_starts().into_iter().map(|(y, _)| y).collect();
        years.dedup();
        years
    }
}

impl FromStr for DateRange {
    type Err = NemdbError;

    fn from_str(raw: &str) -> Result<Self> {
        let (from, to) = raw.split_once("->").ok_or_else(|| {
            NemdbError::Config(format!(
                "expected a range like 2020-01-01->2020-06-01, got '{raw}'"
            ))
        })?;
        DateRange::new(parse_date(from.trim())?, parse_date(to.trim())?)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| NemdbError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    // day 1 always exists
    date.with_day(1).unwrap_or(date)
}
