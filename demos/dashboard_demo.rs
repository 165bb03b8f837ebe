use chrono::NaiveDate;
use retail_dashboard_analytics::*;
use rust_decimal::Decimal;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid demo date")
}

fn seed_source() -> InMemoryEventSource {
    let mut source = InMemoryEventSource::new();

    let receivables = [
        (ymd(2024, 9, 10), 18_400),
        (ymd(2024, 10, 10), 21_150),
        (ymd(2024, 11, 10), 19_870),
        (ymd(2024, 12, 10), 27_300),
        (ymd(2025, 1, 10), 16_900),
        (ymd(2025, 2, 10), 17_450),
    ];
    for (date, amount) in receivables {
        source.insert(
            "loja-centro",
            Some(1),
            EntityKind::Receivable,
            MonetaryEvent::on_date(Decimal::from(amount), date),
        );
    }

    let payables = [
        (ymd(2024, 12, 5), 6_000, "Rent"),
        (ymd(2025, 1, 5), 6_000, "Rent"),
        (ymd(2025, 2, 5), 6_000, "Rent"),
        (ymd(2025, 1, 15), 4_200, "Suppliers"),
        (ymd(2025, 2, 15), 3_950, "Suppliers"),
        (ymd(2025, 2, 18), 780, "Power"),
        (ymd(2025, 2, 19), 310, "Internet"),
        (ymd(2025, 2, 20), 120, "Cleaning"),
        (ymd(2025, 2, 21), 95, "Stationery"),
    ];
    for (date, amount, category) in payables {
        source.insert(
            "loja-centro",
            Some(1),
            EntityKind::Payable,
            MonetaryEvent::on_date(Decimal::from(amount), date).with_category(category),
        );
    }

    for day in 1..=24 {
        for (hour, minute, cents) in [(8, 10, 1_250), (12, 30, 4_590), (18, 45, 3_120)] {
            let at = ymd(2025, 2, day)
                .and_hms_opt(hour, minute, 0)
                .expect("valid demo time");
            source.insert(
                "loja-centro",
                Some(1),
                EntityKind::Sale,
                MonetaryEvent::new(Decimal::new(cents * i64::from(day % 3 + 1), 2), at),
            );
        }
    }

    source
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("📊 Retail Dashboard Demo\n");

    let config = DashboardConfig {
        category_overflow: CategoryOverflow::Aggregate {
            label: "Other".to_string(),
        },
        ..DashboardConfig::default()
    };
    let currency = config.currency.clone();
    let service = DashboardService::new(seed_source(), config)?;

    let tenant = TenantContext::new("loja-centro");
    let report = service.refresh(&tenant, ymd(2025, 2, 24)).await?;

    match &report.cash_flow {
        Ok(cash_flow) => {
            println!("Cash flow ({} to {})", cash_flow.range.start, cash_flow.range.end);
            for bucket in &cash_flow.buckets {
                println!(
                    "  {:<7} revenue {:>14}  expense {:>14}",
                    bucket.label,
                    currency.format(bucket.revenue),
                    currency.format(bucket.expense)
                );
            }
            for kpi in cash_flow.kpis(&currency) {
                match kpi.change {
                    Some(change) => println!("  {}: {} ({})", kpi.label, kpi.value, change),
                    None => println!("  {}: {}", kpi.label, kpi.value),
                }
            }
        }
        Err(e) => println!("Cash flow unavailable: {}", e),
    }

    match &report.sales {
        Ok(sales) => {
            println!("\nSales ({} to {})", sales.range.start, sales.range.end);
            for kpi in sales.kpis(&currency) {
                println!("  {}: {}", kpi.label, kpi.value);
            }
            if let Some(peak) = &sales.peak {
                println!(
                    "  Busiest slot: weekday {} at {:02}h ({} sales, {})",
                    peak.weekday,
                    peak.hour,
                    peak.count,
                    currency.format(peak.total)
                );
            }
        }
        Err(e) => println!("\nSales unavailable: {}", e),
    }

    match &report.categories {
        Ok(categories) => {
            println!("\nExpense categories");
            for (name, share) in categories.shares() {
                println!("  {:<12} {:>5.1}%", name, share.round_dp(1));
            }
        }
        Err(e) => println!("\nCategories unavailable: {}", e),
    }

    Ok(())
}
