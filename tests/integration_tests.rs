use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use retail_dashboard_analytics::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    ymd(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

fn retail_store() -> InMemoryEventSource {
    let mut source = InMemoryEventSource::new();

    // Receivables for unit 1 and unit 2 of "padaria"
    for (month, amount) in [(11, dec!(4000)), (12, dec!(5200)), (1, dec!(4800)), (2, dec!(6100))] {
        let year = if month >= 11 { 2023 } else { 2024 };
        source.insert(
            "padaria",
            Some(1),
            EntityKind::Receivable,
            MonetaryEvent::on_date(amount, ymd(year, month, 10)),
        );
    }
    source.insert(
        "padaria",
        Some(2),
        EntityKind::Receivable,
        MonetaryEvent::on_date(dec!(900), ymd(2024, 2, 12)),
    );

    // Payables
    let payables = [
        (ymd(2023, 12, 5), dec!(2500), Some("Rent")),
        (ymd(2024, 1, 5), dec!(2500), Some("Rent")),
        (ymd(2024, 2, 5), dec!(2500), Some("Rent")),
        (ymd(2024, 1, 20), dec!(800), Some("Flour")),
        (ymd(2024, 2, 20), dec!(950), Some("Flour")),
        (ymd(2024, 2, 21), dec!(300), Some("Power")),
        (ymd(2024, 2, 22), dec!(120), Some("Water")),
        (ymd(2024, 2, 23), dec!(90), Some("Internet")),
        (ymd(2024, 2, 24), dec!(60), Some("Cleaning")),
        (ymd(2024, 2, 25), dec!(40), None),
    ];
    for (date, amount, category) in payables {
        let mut event = MonetaryEvent::on_date(amount, date);
        event.category = category.map(str::to_string);
        source.insert("padaria", Some(1), EntityKind::Payable, event);
    }

    // Sales: busy Saturday mornings (2024-02-17 was a Saturday)
    let sales = [
        (Some(1), dec!(35.50), at(2024, 2, 17, 8, 15)),
        (Some(1), dec!(12.00), at(2024, 2, 17, 8, 40)),
        (Some(1), dec!(7.25), at(2024, 2, 19, 15, 5)),
        (Some(2), dec!(20.00), at(2024, 2, 19, 23, 50)),
    ];
    for (unit, amount, occurred_at) in sales {
        source.insert("padaria", unit, EntityKind::Sale, MonetaryEvent::new(amount, occurred_at));
    }

    // Another tenant that must never leak into "padaria"
    source.insert(
        "mercado",
        Some(1),
        EntityKind::Receivable,
        MonetaryEvent::on_date(dec!(100000), ymd(2024, 2, 1)),
    );

    source
}

#[tokio::test]
async fn test_full_dashboard_for_tenant() {
    let config = DashboardConfig {
        window_months: 4,
        ..DashboardConfig::default()
    };
    let service = DashboardService::new(retail_store(), config).unwrap();

    let report = service
        .refresh(&TenantContext::new("padaria"), ymd(2024, 2, 20))
        .await
        .unwrap();

    assert!(report.is_complete());

    let cash_flow = report.cash_flow.as_ref().unwrap();
    let keys: Vec<&str> = cash_flow.buckets.iter().map(|b| b.key.as_str()).collect();
    assert_eq!(keys, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
    assert_eq!(cash_flow.buckets[3].revenue, dec!(7000));
    assert_eq!(cash_flow.total_revenue, dec!(21000));
    assert_eq!(cash_flow.buckets[0].expense, Decimal::ZERO);
    assert_eq!(cash_flow.total_expense, dec!(9860));

    let categories = report.categories.as_ref().unwrap();
    assert_eq!(categories.breakdown.slices.len(), 5);
    assert_eq!(categories.breakdown.slices[0].name, "Rent");
    assert_eq!(categories.breakdown.slices[0].value, dec!(7500));
    assert_eq!(categories.breakdown.distinct_categories, 7);
    assert!(categories.breakdown.shown_total() < categories.breakdown.grand_total);

    let sales = report.sales.as_ref().unwrap();
    assert_eq!(sales.heat_cells.len(), 98);
    assert_eq!(sales.count, 4);
    assert_eq!(sales.total, dec!(74.75));
    let peak = sales.peak.as_ref().unwrap();
    assert_eq!((peak.weekday, peak.hour, peak.count), (6, 8, 2));
}

#[tokio::test]
async fn test_unit_scope_limits_rows() {
    let service = DashboardService::new(retail_store(), DashboardConfig::default()).unwrap();

    let report = service
        .refresh(&TenantContext::new("padaria").with_unit(2), ymd(2024, 2, 20))
        .await
        .unwrap();

    let cash_flow = report.cash_flow.unwrap();
    assert_eq!(cash_flow.total_revenue, dec!(900));
    assert_eq!(cash_flow.total_expense, Decimal::ZERO);
    assert_eq!(report.sales.unwrap().count, 1);
    assert!(report.categories.unwrap().breakdown.slices.is_empty());
}

#[tokio::test]
async fn test_failed_section_does_not_fail_the_others() {
    let mut source = retail_store();
    source.fail_entity(
        EntityKind::Sale,
        FetchError::Network {
            entity: EntityKind::Sale,
            message: "connection reset".to_string(),
        },
    );
    let service = DashboardService::new(source, DashboardConfig::default()).unwrap();

    let report = service
        .refresh(&TenantContext::new("padaria"), ymd(2024, 2, 20))
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert!(report.cash_flow.is_ok());
    assert!(report.categories.is_ok());
    let failed = report.failed_sections();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "sales");
    assert_eq!(failed[0].1.entity(), EntityKind::Sale);
}

#[tokio::test]
async fn test_failed_payables_mark_both_dependent_sections() {
    let mut source = retail_store();
    source.fail_entity(
        EntityKind::Payable,
        FetchError::Permission {
            entity: EntityKind::Payable,
            message: "policy denied".to_string(),
        },
    );
    let service = DashboardService::new(source, DashboardConfig::default()).unwrap();

    let report = service
        .refresh(&TenantContext::new("padaria"), ymd(2024, 2, 20))
        .await
        .unwrap();

    assert!(report.cash_flow.is_err());
    assert!(report.categories.is_err());
    assert!(report.sales.is_ok());
}

#[tokio::test]
async fn test_rent_and_supplies_two_month_window() {
    let events = vec![
        MonetaryEvent::on_date(dec!(100), ymd(2024, 1, 15)).with_category("Rent"),
        MonetaryEvent::on_date(dec!(50), ymd(2024, 1, 20)).with_category("Rent"),
        MonetaryEvent::on_date(dec!(30), ymd(2024, 2, 1)).with_category("Supplies"),
    ];
    let mut source = InMemoryEventSource::new();
    for event in &events {
        source.insert("t", None, EntityKind::Receivable, event.clone());
    }

    let config = DashboardConfig {
        window_months: 2,
        ..DashboardConfig::default()
    };
    let service = DashboardService::new(source, config).unwrap();
    let report = service
        .refresh(&TenantContext::new("t"), ymd(2024, 2, 29))
        .await
        .unwrap();

    let buckets = report.cash_flow.unwrap().buckets;
    assert_eq!(buckets.len(), 2);
    assert_eq!((buckets[0].key.as_str(), buckets[0].revenue), ("2024-01", dec!(150)));
    assert_eq!((buckets[1].key.as_str(), buckets[1].revenue), ("2024-02", dec!(30)));

    assert_eq!(
        top_categories(&events),
        vec![
            CategorySlice { name: "Rent".to_string(), value: dec!(150) },
            CategorySlice { name: "Supplies".to_string(), value: dec!(30) },
        ]
    );
}

/// Source that answers one tenant slowly, to let a newer request overtake it.
struct SlowTenantSource {
    inner: InMemoryEventSource,
    slow_tenant: String,
    calls: AtomicUsize,
}

#[async_trait]
impl EventSource for SlowTenantSource {
    async fn fetch_events(&self, query: &EventQuery) -> SectionResult<Vec<MonetaryEvent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if query.tenant.tenant_id == self.slow_tenant {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        self.inner.fetch_events(query).await
    }
}

#[tokio::test]
async fn test_stale_request_is_discarded() {
    let source = Arc::new(SlowTenantSource {
        inner: retail_store(),
        slow_tenant: "padaria".to_string(),
        calls: AtomicUsize::new(0),
    });
    let service = DashboardService::new(source.clone(), DashboardConfig::default()).unwrap();

    let padaria = TenantContext::new("padaria");
    let mercado = TenantContext::new("mercado");

    let stale = service.begin();
    let (stale_result, fresh_result) = tokio::join!(
        service.load(stale, &padaria, ymd(2024, 2, 20)),
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            service.refresh(&mercado, ymd(2024, 2, 20)).await
        }
    );

    match stale_result {
        Err(AnalyticsError::Superseded { ticket, current }) => {
            assert_eq!(ticket, stale.generation());
            assert!(current > ticket);
        }
        other => panic!("expected a superseded error, got {:?}", other.map(|r| r.ticket)),
    }

    let fresh = fresh_result.unwrap();
    assert_eq!(fresh.tenant, mercado);
    assert_eq!(fresh.cash_flow.unwrap().total_revenue, dec!(100000));
    assert_eq!(source.calls.load(Ordering::SeqCst), 8);
}

#[test]
fn test_offline_processing_matches_window_rules() {
    let batch = EventBatch {
        receivables: vec![
            MonetaryEvent::on_date(dec!(10), ymd(2024, 1, 1)),
            MonetaryEvent::on_date(dec!(20), ymd(2024, 2, 29)),
            MonetaryEvent::on_date(dec!(40), ymd(2023, 12, 31)),
            MonetaryEvent::on_date(dec!(80), ymd(2024, 3, 1)),
        ],
        ..EventBatch::default()
    };
    let config = DashboardConfig {
        window_months: 2,
        ..DashboardConfig::default()
    };

    let snapshot = process_dashboard(&batch, &config, ymd(2024, 2, 10)).unwrap();
    assert_eq!(snapshot.cash_flow.total_revenue, dec!(30));
    assert_eq!(snapshot.cash_flow.stats.dropped, 0);
}

#[test]
fn test_config_file_round_trip_on_disk() -> anyhow::Result<()> {
    let path = std::env::temp_dir().join(format!(
        "dashboard-config-{}.json",
        std::process::id()
    ));
    std::fs::write(&path, r#"{ "window_months": 12, "top_categories": 3 }"#)?;

    let config = DashboardConfig::from_json_file(&path)?;
    std::fs::remove_file(&path)?;

    assert_eq!(config.window_months, 12);
    assert_eq!(config.top_categories, 3);
    assert_eq!(config.sales_window_days, 30);
    Ok(())
}
