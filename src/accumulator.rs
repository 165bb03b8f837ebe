use crate::schema::{DayBucket, HeatCell, MonetaryEvent, MonthBucket};
use crate::utils::{month_key, weekday_index};
use chrono::{NaiveDate, Timelike};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which side of a month bucket an entity feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthSide {
    Revenue,
    Expense,
}

/// How many events landed in a bucket and how many had no bucket to go to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AccumulationStats {
    pub matched: usize,
    pub dropped: usize,
}

impl AccumulationStats {
    pub fn merge(self, other: AccumulationStats) -> AccumulationStats {
        AccumulationStats {
            matched: self.matched + other.matched,
            dropped: self.dropped + other.dropped,
        }
    }
}

/// Adds each event's amount to the month bucket matching its `YYYY-MM` key.
/// Events whose month has no pre-seeded bucket are dropped.
pub fn accumulate_months(
    buckets: &mut [MonthBucket],
    events: &[MonetaryEvent],
    side: MonthSide,
) -> AccumulationStats {
    let index: HashMap<String, usize> = buckets
        .iter()
        .enumerate()
        .map(|(i, b)| (b.key.clone(), i))
        .collect();

    let mut stats = AccumulationStats::default();
    for event in events {
        match index.get(&month_key(event.date())) {
            Some(&i) => {
                let bucket = &mut buckets[i];
                match side {
                    MonthSide::Revenue => bucket.revenue += event.amount,
                    MonthSide::Expense => bucket.expense += event.amount,
                }
                stats.matched += 1;
            }
            None => stats.dropped += 1,
        }
    }

    if stats.dropped > 0 {
        debug!(
            "{} of {} events fell outside the seeded months ({:?})",
            stats.dropped,
            events.len(),
            side
        );
    }
    stats
}

/// Adds each event to the (weekday, hour) cell of its timestamp and bumps the
/// cell's count. Hours outside the grid are dropped.
pub fn accumulate_heat(cells: &mut [HeatCell], events: &[MonetaryEvent]) -> AccumulationStats {
    let index: HashMap<(u32, u32), usize> = cells
        .iter()
        .enumerate()
        .map(|(i, c)| ((c.weekday, c.hour), i))
        .collect();

    let mut stats = AccumulationStats::default();
    for event in events {
        let key = (weekday_index(event.date()), event.occurred_at.hour());
        match index.get(&key) {
            Some(&i) => {
                cells[i].total += event.amount;
                cells[i].count += 1;
                stats.matched += 1;
            }
            None => stats.dropped += 1,
        }
    }

    if stats.dropped > 0 {
        debug!(
            "{} of {} sales fell outside the tracked hours",
            stats.dropped,
            events.len()
        );
    }
    stats
}

pub fn accumulate_days(days: &mut [DayBucket], events: &[MonetaryEvent]) -> AccumulationStats {
    let index: HashMap<NaiveDate, usize> = days
        .iter()
        .enumerate()
        .map(|(i, d)| (d.date, i))
        .collect();

    let mut stats = AccumulationStats::default();
    for event in events {
        match index.get(&event.date()) {
            Some(&i) => {
                days[i].total += event.amount;
                days[i].count += 1;
                stats.matched += 1;
            }
            None => stats.dropped += 1,
        }
    }
    stats
}
