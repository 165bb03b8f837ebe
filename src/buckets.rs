//! Pre-seeded aggregation slots. Every period inside a window gets a zeroed
//! bucket up front so empty periods show up as zero instead of going missing.

use crate::error::Result;
use crate::schema::{DayBucket, HeatCell, MonthBucket};
use crate::utils::{month_label, shift_month, validate_window_months, DateRange};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

pub const WEEKDAYS: u32 = 7;
pub const HEAT_FIRST_HOUR: u32 = 7;
pub const HEAT_LAST_HOUR: u32 = 20;
pub const HEAT_HOURS: u32 = HEAT_LAST_HOUR - HEAT_FIRST_HOUR + 1;
pub const HEAT_CELL_COUNT: usize = (WEEKDAYS * HEAT_HOURS) as usize;

/// Zeroed buckets for the `months` calendar months ending with the month of
/// `as_of`, oldest first.
pub fn seed_month_buckets(as_of: NaiveDate, months: u32) -> Result<Vec<MonthBucket>> {
    validate_window_months(months)?;

    let mut buckets = Vec::with_capacity(months as usize);
    for back in (0..months).rev() {
        let (year, month) = shift_month(as_of.year(), as_of.month(), -(back as i32));
        buckets.push(MonthBucket {
            key: format!("{:04}-{:02}", year, month),
            label: month_label(year, month)?,
            revenue: Decimal::ZERO,
            expense: Decimal::ZERO,
        });
    }

    Ok(buckets)
}

/// All 98 weekday × hour cells, weekday-major (Sunday 07h, Sunday 08h, ...).
pub fn seed_heat_cells() -> Vec<HeatCell> {
    let mut cells = Vec::with_capacity(HEAT_CELL_COUNT);
    for weekday in 0..WEEKDAYS {
        for hour in HEAT_FIRST_HOUR..=HEAT_LAST_HOUR {
            cells.push(HeatCell {
                weekday,
                hour,
                total: Decimal::ZERO,
                count: 0,
            });
        }
    }
    cells
}

/// Position of a (weekday, hour) pair inside the slice built by
/// [`seed_heat_cells`], or `None` outside the tracked hours.
pub fn heat_cell_index(weekday: u32, hour: u32) -> Option<usize> {
    if weekday >= WEEKDAYS || !(HEAT_FIRST_HOUR..=HEAT_LAST_HOUR).contains(&hour) {
        return None;
    }
    Some((weekday * HEAT_HOURS + (hour - HEAT_FIRST_HOUR)) as usize)
}

/// One zeroed bucket per day of `range`.
pub fn seed_day_buckets(range: &DateRange) -> Vec<DayBucket> {
    range
        .days()
        .map(|date| DayBucket {
            date,
            total: Decimal::ZERO,
            count: 0,
        })
        .collect()
}
