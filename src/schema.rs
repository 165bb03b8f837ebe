use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[schemars(description = "Money owed to the tenant (accounts receivable), dated by due date")]
    Receivable,

    #[schemars(description = "Money owed by the tenant (accounts payable), dated by due date")]
    Payable,

    #[schemars(description = "Point-of-sale transaction, dated by its creation timestamp")]
    Sale,
}

impl EntityKind {
    pub fn date_field(self) -> DateField {
        match self {
            EntityKind::Receivable | EntityKind::Payable => DateField::DueDate,
            EntityKind::Sale => DateField::CreatedAt,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Receivable => "receivable",
            EntityKind::Payable => "payable",
            EntityKind::Sale => "sale",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The column a range filter is applied to. Due dates are date-only while
/// creation stamps carry a time of day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    DueDate,
    CreatedAt,
}

impl DateField {
    pub fn column(self) -> &'static str {
        match self {
            DateField::DueDate => "due_date",
            DateField::CreatedAt => "created_at",
        }
    }

    pub fn has_time_component(self) -> bool {
        matches!(self, DateField::CreatedAt)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl Default for EventStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// One receivable, payable or sale row as returned by the data store.
/// Date-only rows carry midnight as their time of day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MonetaryEvent {
    pub amount: Decimal,
    pub occurred_at: NaiveDateTime,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
}

impl MonetaryEvent {
    pub fn new(amount: Decimal, occurred_at: NaiveDateTime) -> Self {
        Self {
            amount,
            occurred_at,
            category: None,
            status: EventStatus::Pending,
        }
    }

    /// Builds a date-only event, as produced by due-date columns.
    pub fn on_date(amount: Decimal, date: NaiveDate) -> Self {
        Self::new(amount, date.and_time(chrono::NaiveTime::MIN))
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.occurred_at.date()
    }
}

/// Explicit tenant scope threaded through every fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct TenantContext {
    #[schemars(description = "Domain identifier isolating one customer organization")]
    pub tenant_id: String,

    #[serde(default)]
    #[schemars(description = "Branch/store currently selected; None aggregates the whole tenant")]
    pub active_unit_id: Option<i64>,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            active_unit_id: None,
        }
    }

    pub fn with_unit(mut self, unit_id: i64) -> Self {
        self.active_unit_id = Some(unit_id);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct MonthBucket {
    /// Calendar month in `YYYY-MM` form
    pub key: String,
    pub label: String,
    pub revenue: Decimal,
    pub expense: Decimal,
}

impl MonthBucket {
    pub fn net(&self) -> Decimal {
        self.revenue - self.expense
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct HeatCell {
    /// 0 = Sunday .. 6 = Saturday
    pub weekday: u32,
    pub hour: u32,
    pub total: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub total: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CategorySlice {
    pub name: String,
    pub value: Decimal,
}
