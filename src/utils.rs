use crate::error::{AnalyticsError, Result};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar days. Every window comparison in the crate goes
/// through this type so date-only and timestamp columns compare at the same
/// (day) resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(AnalyticsError::DateError(format!(
                "Range end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// The `months` calendar months ending with the month of `as_of`, from
    /// the first day of the oldest month to the last day of the current one.
    pub fn trailing_months(as_of: NaiveDate, months: u32) -> Result<Self> {
        validate_window_months(months)?;
        let (start_year, start_month) =
            shift_month(as_of.year(), as_of.month(), -(months as i32 - 1));
        let start = first_day_of_month(start_year, start_month)?;
        let end = last_day_of_month(as_of.year(), as_of.month())?;
        Self::new(start, end)
    }

    /// The `days` days ending with `as_of` (inclusive).
    pub fn trailing_days(as_of: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(AnalyticsError::DateError(
                "A trailing day window needs at least one day".to_string(),
            ));
        }
        let start = as_of
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| {
                AnalyticsError::DateError(format!("{} days before {} is out of range", days, as_of))
            })?;
        Self::new(start, as_of)
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Day-resolution membership: the time of day never affects the result.
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.contains_date(timestamp.date())
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

pub fn validate_window_months(months: u32) -> Result<()> {
    if !(1..=36).contains(&months) {
        return Err(AnalyticsError::InvalidWindow(months));
    }
    Ok(())
}

/// Moves `(year, month)` by `delta` months, crossing year boundaries.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let zero_based = year * 12 + (month as i32 - 1) + delta;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

pub fn first_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AnalyticsError::DateError(format!("Invalid month {}-{:02}", year, month)))
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    let (next_year, next_month) = shift_month(year, month, 1);

    first_day_of_month(next_year, next_month)?
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| AnalyticsError::DateError(format!("Invalid month {}-{:02}", year, month)))
}

/// Bucket key for a date: `YYYY-MM`.
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Short display label for a month, e.g. `Jan/24`.
pub fn month_label(year: i32, month: u32) -> Result<String> {
    Ok(first_day_of_month(year, month)?.format("%b/%y").to_string())
}

/// Parses a `YYYY-MM` bucket key into `(year, month)`.
pub fn parse_month_key(key: &str) -> Result<(i32, u32)> {
    let start_str = format!("{}-01", key.trim());
    let date = NaiveDate::parse_from_str(&start_str, "%Y-%m-%d").map_err(|_| {
        AnalyticsError::DateError(format!("Invalid month key: {}. Expected YYYY-MM", key))
    })?;
    Ok((date.year(), date.month()))
}

/// Weekday index with Sunday as 0, the layout heat cells use.
pub fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}
