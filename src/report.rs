use crate::accumulator::{
    accumulate_days, accumulate_heat, accumulate_months, AccumulationStats, MonthSide,
};
use crate::buckets::{seed_day_buckets, seed_heat_cells, seed_month_buckets};
use crate::categories::{reduce_categories, CategoryBreakdown};
use crate::config::DashboardConfig;
use crate::error::{AnalyticsError, FetchError, Result, SectionResult};
use crate::fetcher::{EventQuery, EventSource};
use crate::forecast::forecast_next;
use crate::format::{format_percent, pct_change, CurrencyFormat};
use crate::schema::{
    DayBucket, EntityKind, EventStatus, HeatCell, MonetaryEvent, MonthBucket, TenantContext,
};
use crate::utils::DateRange;
use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Windows and seeded month buckets for one report run.
#[derive(Debug, Clone)]
pub struct ReportPlan {
    pub as_of: NaiveDate,
    pub month_range: DateRange,
    pub sales_range: DateRange,
    month_buckets: Vec<MonthBucket>,
}

impl ReportPlan {
    pub fn new(as_of: NaiveDate, config: &DashboardConfig) -> Result<Self> {
        Ok(Self {
            as_of,
            month_range: DateRange::trailing_months(as_of, config.window_months)?,
            sales_range: DateRange::trailing_days(as_of, config.sales_window_days)?,
            month_buckets: seed_month_buckets(as_of, config.window_months)?,
        })
    }

    pub fn month_buckets(&self) -> Vec<MonthBucket> {
        self.month_buckets.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashFlowSection {
    pub range: DateRange,
    pub buckets: Vec<MonthBucket>,
    pub total_revenue: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    /// Revenue of the current month against the previous one, in percent
    pub revenue_change_pct: Decimal,
    pub revenue_forecast: Decimal,
    pub stats: AccumulationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SalesSection {
    pub range: DateRange,
    pub heat_cells: Vec<HeatCell>,
    pub daily: Vec<DayBucket>,
    pub total: Decimal,
    pub count: u64,
    pub average_ticket: Decimal,
    /// Busiest cell by total; the earliest weekday/hour wins ties
    pub peak: Option<HeatCell>,
    pub stats: AccumulationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategorySection {
    pub range: DateRange,
    pub breakdown: CategoryBreakdown,
}

/// A display-ready figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Kpi {
    pub label: String,
    pub value: String,
    pub change: Option<String>,
}

pub fn build_cash_flow(
    range: DateRange,
    mut buckets: Vec<MonthBucket>,
    receivables: &[MonetaryEvent],
    payables: &[MonetaryEvent],
) -> CashFlowSection {
    let revenue_stats = accumulate_months(&mut buckets, receivables, MonthSide::Revenue);
    let expense_stats = accumulate_months(&mut buckets, payables, MonthSide::Expense);

    let total_revenue: Decimal = buckets.iter().map(|b| b.revenue).sum();
    let total_expense: Decimal = buckets.iter().map(|b| b.expense).sum();

    let revenues: Vec<Decimal> = buckets.iter().map(|b| b.revenue).collect();
    let revenue_change_pct = match revenues.as_slice() {
        [.., previous, current] => pct_change(*current, *previous),
        _ => Decimal::ZERO,
    };

    CashFlowSection {
        range,
        total_revenue,
        total_expense,
        net: total_revenue - total_expense,
        revenue_change_pct,
        revenue_forecast: forecast_next(&revenues),
        stats: revenue_stats.merge(expense_stats),
        buckets,
    }
}

pub fn build_sales(range: DateRange, sales: &[MonetaryEvent]) -> SalesSection {
    let mut heat_cells = seed_heat_cells();
    let mut daily = seed_day_buckets(&range);

    let stats = accumulate_heat(&mut heat_cells, sales);
    accumulate_days(&mut daily, sales);

    // Totals come from the daily series, which covers every hour of the day.
    let total: Decimal = daily.iter().map(|d| d.total).sum();
    let count: u64 = daily.iter().map(|d| d.count).sum();
    let average_ticket = if count == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(count)
    };

    let peak = heat_cells
        .iter()
        .filter(|c| c.count > 0)
        .fold(None::<&HeatCell>, |best, cell| match best {
            Some(b) if b.total >= cell.total => Some(b),
            _ => Some(cell),
        })
        .cloned();

    SalesSection {
        range,
        heat_cells,
        daily,
        total,
        count,
        average_ticket,
        peak,
        stats,
    }
}

pub fn build_categories(
    range: DateRange,
    payables: &[MonetaryEvent],
    config: &DashboardConfig,
) -> CategorySection {
    CategorySection {
        range,
        breakdown: reduce_categories(
            payables,
            config.top_categories,
            &config.fallback_category,
            &config.category_overflow,
        ),
    }
}

impl CashFlowSection {
    pub fn kpis(&self, currency: &CurrencyFormat) -> Vec<Kpi> {
        vec![
            Kpi {
                label: "Revenue".to_string(),
                value: currency.format(self.total_revenue),
                change: Some(format_percent(self.revenue_change_pct)),
            },
            Kpi {
                label: "Expenses".to_string(),
                value: currency.format(self.total_expense),
                change: None,
            },
            Kpi {
                label: "Net".to_string(),
                value: currency.format(self.net),
                change: None,
            },
            Kpi {
                label: "Next month forecast".to_string(),
                value: currency.format(self.revenue_forecast),
                change: None,
            },
        ]
    }
}

impl SalesSection {
    pub fn kpis(&self, currency: &CurrencyFormat) -> Vec<Kpi> {
        vec![
            Kpi {
                label: "Sales".to_string(),
                value: currency.format(self.total),
                change: None,
            },
            Kpi {
                label: "Transactions".to_string(),
                value: self.count.to_string(),
                change: None,
            },
            Kpi {
                label: "Average ticket".to_string(),
                value: currency.format(self.average_ticket),
                change: None,
            },
        ]
    }
}

impl CategorySection {
    /// Each slice with its share of the grand total.
    pub fn shares(&self) -> Vec<(String, Decimal)> {
        let total = self.breakdown.grand_total;
        self.breakdown
            .slices
            .iter()
            .map(|s| {
                let share = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    s.value / total * Decimal::ONE_HUNDRED
                };
                (s.name.clone(), share)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DashboardReport {
    pub ticket: RequestTicket,
    pub tenant: TenantContext,
    pub as_of: NaiveDate,
    pub cash_flow: SectionResult<CashFlowSection>,
    pub sales: SectionResult<SalesSection>,
    pub categories: SectionResult<CategorySection>,
}

impl DashboardReport {
    pub fn is_complete(&self) -> bool {
        self.cash_flow.is_ok() && self.sales.is_ok() && self.categories.is_ok()
    }

    pub fn failed_sections(&self) -> Vec<(&'static str, &FetchError)> {
        let mut failed = Vec::new();
        if let Err(e) = &self.cash_flow {
            failed.push(("cash_flow", e));
        }
        if let Err(e) = &self.sales {
            failed.push(("sales", e));
        }
        if let Err(e) = &self.categories {
            failed.push(("categories", e));
        }
        failed
    }
}

/// Identifies one report request. Only the newest ticket's result is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct ReportSession {
    generation: AtomicU64,
}

impl ReportSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new request, superseding every earlier ticket.
    pub fn begin(&self) -> RequestTicket {
        RequestTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.current() == ticket.0
    }

    pub fn accept<T>(&self, ticket: RequestTicket, value: T) -> Result<T> {
        let current = self.current();
        if current != ticket.0 {
            return Err(AnalyticsError::Superseded {
                ticket: ticket.0,
                current,
            });
        }
        Ok(value)
    }
}

pub(crate) fn countable(
    mut events: Vec<MonetaryEvent>,
    exclude_cancelled: bool,
) -> Vec<MonetaryEvent> {
    if exclude_cancelled {
        let before = events.len();
        events.retain(|e| e.status != EventStatus::Cancelled);
        if events.len() < before {
            debug!("Ignoring {} cancelled rows", before - events.len());
        }
    }
    events
}

pub struct DashboardService<S> {
    source: S,
    config: DashboardConfig,
    session: ReportSession,
}

impl<S: EventSource> DashboardService<S> {
    pub fn new(source: S, config: DashboardConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            config,
            session: ReportSession::new(),
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn session(&self) -> &ReportSession {
        &self.session
    }

    pub fn begin(&self) -> RequestTicket {
        self.session.begin()
    }

    /// Starts a new request and loads it.
    pub async fn refresh(
        &self,
        tenant: &TenantContext,
        as_of: NaiveDate,
    ) -> Result<DashboardReport> {
        let ticket = self.begin();
        self.load(ticket, tenant, as_of).await
    }

    /// Fetches and computes the three sections concurrently. A failing
    /// section is reported in place without affecting the other two. Fails
    /// with [`AnalyticsError::Superseded`] when a newer request was begun
    /// before this one finished.
    pub async fn load(
        &self,
        ticket: RequestTicket,
        tenant: &TenantContext,
        as_of: NaiveDate,
    ) -> Result<DashboardReport> {
        let plan = ReportPlan::new(as_of, &self.config)?;

        info!(
            "Loading dashboard #{} for tenant {} (unit {:?}) as of {}",
            ticket.0, tenant.tenant_id, tenant.active_unit_id, as_of
        );

        let (cash_flow, sales, categories) = futures::join!(
            self.load_cash_flow(tenant, &plan),
            self.load_sales(tenant, &plan),
            self.load_categories(tenant, &plan),
        );

        let report = DashboardReport {
            ticket,
            tenant: tenant.clone(),
            as_of,
            cash_flow,
            sales,
            categories,
        };

        for (section, error) in report.failed_sections() {
            warn!("Dashboard section {} failed: {}", section, error);
        }

        match self.session.accept(ticket, report) {
            Ok(report) => {
                info!(
                    "Dashboard #{} loaded ({} of 3 sections ok)",
                    ticket.0,
                    3 - report.failed_sections().len()
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Discarding dashboard #{}: {}", ticket.0, e);
                Err(e)
            }
        }
    }

    async fn fetch(
        &self,
        entity: EntityKind,
        tenant: &TenantContext,
        range: DateRange,
    ) -> SectionResult<Vec<MonetaryEvent>> {
        let events = self
            .source
            .fetch_events(&EventQuery::new(entity, tenant, range))
            .await?;
        Ok(countable(events, self.config.exclude_cancelled))
    }

    async fn load_cash_flow(
        &self,
        tenant: &TenantContext,
        plan: &ReportPlan,
    ) -> SectionResult<CashFlowSection> {
        let receivables = self
            .fetch(EntityKind::Receivable, tenant, plan.month_range)
            .await?;
        let payables = self
            .fetch(EntityKind::Payable, tenant, plan.month_range)
            .await?;

        let section = build_cash_flow(
            plan.month_range,
            plan.month_buckets(),
            &receivables,
            &payables,
        );
        debug!(
            "Cash flow: {} rows matched, {} dropped",
            section.stats.matched, section.stats.dropped
        );
        Ok(section)
    }

    async fn load_sales(
        &self,
        tenant: &TenantContext,
        plan: &ReportPlan,
    ) -> SectionResult<SalesSection> {
        let sales = self.fetch(EntityKind::Sale, tenant, plan.sales_range).await?;
        let section = build_sales(plan.sales_range, &sales);
        debug!(
            "Sales: {} rows in heatmap, {} outside tracked hours",
            section.stats.matched, section.stats.dropped
        );
        Ok(section)
    }

    async fn load_categories(
        &self,
        tenant: &TenantContext,
        plan: &ReportPlan,
    ) -> SectionResult<CategorySection> {
        // Fetched again rather than shared so a cash flow failure stays in its own section.
        let payables = self
            .fetch(EntityKind::Payable, tenant, plan.month_range)
            .await?;
        Ok(build_categories(plan.month_range, &payables, &self.config))
    }
}
