//! Profitability report command.

use chrono::{Days, NaiveDate, Utc};

use shoplink::config::AppConfig;
use shoplink::report::{DailyReport, ProfitReporter, RangeReport};

use crate::commands::open_store;

const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Print the profitability report for an explicit date range or a lookback
/// window ending today.
pub async fn run(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    days: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let store = open_store(&config).await?;
    let reporter = ProfitReporter::new(&store);

    let (from, to) = resolve_range(from, to, days, Utc::now().date_naive());
    let report = reporter.range(from, to).await?;

    #[allow(clippy::print_stdout)]
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }
    Ok(())
}

/// Turn the command-line date arguments into an inclusive range.
///
/// An explicit `--from` wins (with `--to` defaulting to the same day);
/// otherwise the report covers the last `--days` days ending today,
/// defaulting to a week.
fn resolve_range(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    days: Option<u32>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    match from {
        Some(from) => (from, to.unwrap_or(from)),
        None => {
            let days = days.unwrap_or(DEFAULT_LOOKBACK_DAYS).max(1);
            let from = today - Days::new(u64::from(days - 1));
            (from, today)
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_text(report: &RangeReport) {
    for day in &report.days {
        print_day(day);
    }
    if report.days.len() > 1 {
        println!("{}", "-".repeat(72));
        println!("Range {} .. {}", report.from, report.to);
        print_line(&report.totals, &report.metrics);
    }
}

#[allow(clippy::print_stdout)]
fn print_day(day: &DailyReport) {
    println!("{}", day.date);
    print_line(&day.totals, &day.metrics);
}

#[allow(clippy::print_stdout)]
fn print_line(totals: &shoplink::report::Totals, metrics: &shoplink::report::ProfitMetrics) {
    println!(
        "  orders {:>4}  revenue {:>10}  cost {:>10} (est {:>10})  spend {:>8}",
        totals.orders, totals.revenue, totals.actual_cost, totals.estimated_cost, totals.ad_spend,
    );
    println!(
        "  net before ads {:>10}  net after ads {:>10}  est net after ads {:>10}",
        metrics.net_before_ads, metrics.net_after_ads, metrics.estimated_net_after_ads,
    );
    println!(
        "  ROAS {:.2}  BROAS {:.2}  cost% {:.1}  ad% {:.1}  margin% {:.1}  AOV {:.2}  AFC {:.2}",
        metrics.roas,
        metrics.breakeven_roas,
        metrics.cost_percent,
        metrics.ad_percent,
        metrics.margin_percent,
        metrics.average_order_value,
        metrics.average_fulfillment_cost,
    );
}
