use crate::schema::{CategorySlice, MonetaryEvent};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const DEFAULT_TOP_CATEGORIES: usize = 5;
pub const DEFAULT_FALLBACK_CATEGORY: &str = "Uncategorized";

/// What happens to the categories ranked below the top N.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum CategoryOverflow {
    #[schemars(description = "Drop every category past the top N. Shown totals under-represent the grand total.")]
    Discard,

    #[schemars(description = "Sum every category past the top N into one trailing slice with the given label.")]
    Aggregate { label: String },
}

impl Default for CategoryOverflow {
    fn default() -> Self {
        Self::Discard
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CategoryBreakdown {
    pub slices: Vec<CategorySlice>,
    /// Sum of every event, including categories that did not make the cut
    pub grand_total: Decimal,
    pub distinct_categories: usize,
}

impl CategoryBreakdown {
    pub fn shown_total(&self) -> Decimal {
        self.slices.iter().map(|s| s.value).sum()
    }
}

/// Groups events by category, largest first. Null or blank categories are
/// grouped under `fallback`. Equal sums are ordered by name so the output does
/// not depend on row order.
pub fn rank_categories(events: &[MonetaryEvent], fallback: &str) -> Vec<CategorySlice> {
    let mut groups: BTreeMap<String, Decimal> = BTreeMap::new();

    for event in events {
        let name = match event.category.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => fallback.to_string(),
        };
        *groups.entry(name).or_default() += event.amount;
    }

    let mut slices: Vec<CategorySlice> = groups
        .into_iter()
        .map(|(name, value)| CategorySlice { name, value })
        .collect();

    slices.sort_by(|a, b| match b.value.cmp(&a.value) {
        Ordering::Equal => a.name.cmp(&b.name),
        other => other,
    });
    slices
}

pub fn reduce_categories(
    events: &[MonetaryEvent],
    top_n: usize,
    fallback: &str,
    overflow: &CategoryOverflow,
) -> CategoryBreakdown {
    let mut ranked = rank_categories(events, fallback);
    let distinct_categories = ranked.len();
    let grand_total = ranked.iter().map(|s| s.value).sum();

    let remainder = if ranked.len() > top_n {
        ranked.split_off(top_n)
    } else {
        Vec::new()
    };

    if let CategoryOverflow::Aggregate { label } = overflow {
        if !remainder.is_empty() {
            ranked.push(CategorySlice {
                name: label.clone(),
                value: remainder.iter().map(|s| s.value).sum(),
            });
        }
    }

    CategoryBreakdown {
        slices: ranked,
        grand_total,
        distinct_categories,
    }
}

/// The dashboard's default: top five, remainder discarded.
pub fn top_categories(events: &[MonetaryEvent]) -> Vec<CategorySlice> {
    reduce_categories(
        events,
        DEFAULT_TOP_CATEGORIES,
        DEFAULT_FALLBACK_CATEGORY,
        &CategoryOverflow::Discard,
    )
    .slices
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn event(amount: Decimal, category: Option<&str>) -> MonetaryEvent {
        let mut e = MonetaryEvent::on_date(amount, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        e.category = category.map(str::to_string);
        e
    }

    #[test]
    fn test_groups_and_sorts_descending() {
        let events = vec![
            event(dec!(100), Some("Rent")),
            event(dec!(50), Some("Rent")),
            event(dec!(30), Some("Supplies")),
        ];

        let slices = top_categories(&events);
        assert_eq!(
            slices,
            vec![
                CategorySlice { name: "Rent".to_string(), value: dec!(150) },
                CategorySlice { name: "Supplies".to_string(), value: dec!(30) },
            ]
        );
    }

    #[test]
    fn test_missing_and_blank_categories_use_fallback() {
        let events = vec![
            event(dec!(10), None),
            event(dec!(15), Some("   ")),
            event(dec!(5), Some("")),
        ];

        let slices = top_categories(&events);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].name, "Uncategorized");
        assert_eq!(slices[0].value, dec!(30));
    }

    #[test]
    fn test_truncates_to_top_five() {
        let events: Vec<MonetaryEvent> = ["A", "B", "C", "D", "E", "F", "G"]
            .iter()
            .enumerate()
            .map(|(i, name)| event(Decimal::from(10 * (i as i64 + 1)), Some(name)))
            .collect();

        let breakdown =
            reduce_categories(&events, 5, DEFAULT_FALLBACK_CATEGORY, &CategoryOverflow::Discard);
        assert_eq!(breakdown.slices.len(), 5);
        assert_eq!(breakdown.distinct_categories, 7);
        assert_eq!(breakdown.slices[0].name, "G");
        assert_eq!(breakdown.grand_total, dec!(280));
        assert_eq!(breakdown.shown_total(), dec!(250));
        assert!(breakdown.shown_total() < breakdown.grand_total);
    }

    #[test]
    fn test_shown_total_matches_when_five_or_fewer() {
        let events = vec![
            event(dec!(1), Some("A")),
            event(dec!(2), Some("B")),
            event(dec!(3), Some("C")),
            event(dec!(4), Some("D")),
            event(dec!(5), Some("E")),
        ];
        let breakdown =
            reduce_categories(&events, 5, DEFAULT_FALLBACK_CATEGORY, &CategoryOverflow::Discard);
        assert_eq!(breakdown.shown_total(), breakdown.grand_total);
    }

    #[test]
    fn test_ties_are_independent_of_input_order() {
        let forward = vec![
            event(dec!(10), Some("Zeta")),
            event(dec!(10), Some("Alpha")),
            event(dec!(10), Some("Mid")),
        ];
        let mut backward = forward.clone();
        backward.reverse();

        let a = top_categories(&forward);
        let b = top_categories(&backward);
        assert_eq!(a, b);
        let names: Vec<&str> = a.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn test_aggregate_overflow_appends_other_slice() {
        let events = vec![
            event(dec!(50), Some("A")),
            event(dec!(40), Some("B")),
            event(dec!(3), Some("C")),
            event(dec!(2), Some("D")),
        ];
        let overflow = CategoryOverflow::Aggregate {
            label: "Other".to_string(),
        };

        let breakdown = reduce_categories(&events, 2, DEFAULT_FALLBACK_CATEGORY, &overflow);
        assert_eq!(breakdown.slices.len(), 3);
        assert_eq!(breakdown.slices[2].name, "Other");
        assert_eq!(breakdown.slices[2].value, dec!(5));
        assert_eq!(breakdown.shown_total(), breakdown.grand_total);
    }

    #[test]
    fn test_aggregate_without_remainder_adds_nothing() {
        let events = vec![event(dec!(50), Some("A"))];
        let overflow = CategoryOverflow::Aggregate {
            label: "Other".to_string(),
        };
        let breakdown = reduce_categories(&events, 5, DEFAULT_FALLBACK_CATEGORY, &overflow);
        assert_eq!(breakdown.slices.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let breakdown =
            reduce_categories(&[], 5, DEFAULT_FALLBACK_CATEGORY, &CategoryOverflow::Discard);
        assert!(breakdown.slices.is_empty());
        assert!(breakdown.grand_total.is_zero());
    }
}
