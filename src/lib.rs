//! # Retail Dashboard Analytics
//!
//! A library for turning a tenant's raw sales, receivable and payable rows into
//! the bucketed series behind a retail financial dashboard.
//!
//! ## Core Concepts
//!
//! - **Tenant scope**: every read is scoped by an explicit [`TenantContext`]
//!   (tenant plus optional unit/branch)
//! - **Seeded buckets**: month, day and weekday × hour slots are created up front
//!   so empty periods show up as zero
//! - **Accumulation**: rows are folded into the slot matching their date; rows
//!   without a slot are dropped and counted
//! - **Sections**: cash flow, sales heatmap and category breakdown are fetched
//!   concurrently and fail independently
//! - **Request tickets**: results of superseded requests are discarded
//!
//! ## Example
//!
//! ```rust,ignore
//! use retail_dashboard_analytics::*;
//! use chrono::NaiveDate;
//!
//! let mut source = InMemoryEventSource::new();
//! source.insert(
//!     "acme",
//!     None,
//!     EntityKind::Receivable,
//!     MonetaryEvent::on_date(dec!(100), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
//! );
//!
//! let service = DashboardService::new(source, DashboardConfig::default())?;
//! let report = service
//!     .refresh(&TenantContext::new("acme"), NaiveDate::from_ymd_opt(2024, 2, 20).unwrap())
//!     .await?;
//!
//! let cash_flow = report.cash_flow?;
//! ```

pub mod accumulator;
pub mod buckets;
pub mod categories;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod forecast;
pub mod format;
pub mod report;
pub mod schema;
pub mod utils;

#[cfg(feature = "rest")]
pub mod rest;

pub use accumulator::{
    accumulate_days, accumulate_heat, accumulate_months, AccumulationStats, MonthSide,
};
pub use buckets::{heat_cell_index, seed_day_buckets, seed_heat_cells, seed_month_buckets};
pub use categories::{
    rank_categories, reduce_categories, top_categories, CategoryBreakdown, CategoryOverflow,
};
pub use config::DashboardConfig;
pub use error::{AnalyticsError, FetchError, Result, SectionResult};
pub use fetcher::{EventQuery, EventSource, InMemoryEventSource};
pub use forecast::forecast_next;
pub use format::{format_currency, format_percent, pct_change, CurrencyFormat};
pub use report::{
    build_cash_flow, build_categories, build_sales, CashFlowSection, CategorySection,
    DashboardReport, DashboardService, Kpi, ReportPlan, ReportSession, RequestTicket,
    SalesSection,
};
pub use schema::*;
pub use utils::DateRange;

#[cfg(feature = "rest")]
pub use rest::{RestEventSource, RestTables};

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Rows that were already fetched, one list per entity kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub receivables: Vec<MonetaryEvent>,
    #[serde(default)]
    pub payables: Vec<MonetaryEvent>,
    #[serde(default)]
    pub sales: Vec<MonetaryEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub as_of: NaiveDate,
    pub cash_flow: CashFlowSection,
    pub sales: SalesSection,
    pub categories: CategorySection,
}

pub struct DashboardProcessor;

impl DashboardProcessor {
    /// Computes every section from in-memory rows, without a data source.
    /// Rows outside the configured windows are ignored.
    pub fn process(
        batch: &EventBatch,
        config: &DashboardConfig,
        as_of: NaiveDate,
    ) -> Result<DashboardSnapshot> {
        config.validate()?;
        let plan = ReportPlan::new(as_of, config)?;

        info!("Processing dashboard snapshot as of {}", as_of);
        debug!(
            "Batch contains {} receivables, {} payables and {} sales",
            batch.receivables.len(),
            batch.payables.len(),
            batch.sales.len()
        );

        let in_range = |events: &[MonetaryEvent], range: &DateRange| -> Vec<MonetaryEvent> {
            let events: Vec<MonetaryEvent> = events
                .iter()
                .filter(|e| range.contains(e.occurred_at))
                .cloned()
                .collect();
            report::countable(events, config.exclude_cancelled)
        };

        let receivables = in_range(&batch.receivables, &plan.month_range);
        let payables = in_range(&batch.payables, &plan.month_range);
        let sales = in_range(&batch.sales, &plan.sales_range);

        Ok(DashboardSnapshot {
            as_of,
            cash_flow: build_cash_flow(
                plan.month_range,
                plan.month_buckets(),
                &receivables,
                &payables,
            ),
            sales: build_sales(plan.sales_range, &sales),
            categories: build_categories(plan.month_range, &payables, config),
        })
    }
}

pub fn process_dashboard(
    batch: &EventBatch,
    config: &DashboardConfig,
    as_of: NaiveDate,
) -> Result<DashboardSnapshot> {
    DashboardProcessor::process(batch, config, as_of)
}
