use std::fmt::Write as _;

use ordercohort_core::{CohortData, CohortSummary, OrderIndex, Retention, RetentionBucket};
use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};
use serde::Serialize;

const COHORT_WIDTH: usize = 10;
const CUSTOMERS_WIDTH: usize = 11;
const CELL_WIDTH: usize = 9;

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    n: OrderIndex,
    cohorts: &'a [CohortData],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a CohortSummary>,
}

/// Serialize the unrounded cohort table (and summary when present).
///
/// # Errors
///
/// Returns an error if serialization fails.
pub(crate) fn render_json(
    n: OrderIndex,
    cohorts: &[CohortData],
    summary: Option<&CohortSummary>,
) -> anyhow::Result<String> {
    let report = JsonReport {
        n,
        cohorts,
        summary,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Percentage rounded half away from zero to one decimal place.
fn format_pct(value: f64) -> String {
    Decimal::from_f64(value).map_or_else(
        || "-".to_string(),
        |d| {
            let rounded = d.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.1}")
        },
    )
}

fn header(first: &str) -> String {
    let mut line = format!("{first:<COHORT_WIDTH$}{:>CUSTOMERS_WIDTH$}", "CUSTOMERS");
    for bucket in RetentionBucket::ALL {
        let label = bucket.key().to_uppercase();
        let _ = write!(line, "{label:>CELL_WIDTH$}");
    }
    line.push('\n');
    line
}

fn row<T>(label: &str, customers: u64, cells: &Retention<T>, fmt: impl Fn(&T) -> String) -> String {
    let mut line = format!("{label:<COHORT_WIDTH$}{customers:>CUSTOMERS_WIDTH$}");
    for (_, value) in cells.iter() {
        let _ = write!(line, "{:>CELL_WIDTH$}", fmt(value));
    }
    line.push('\n');
    line
}

/// Render the cohort table as fixed-width text: retained customers per
/// bucket, then retention percentages. With a summary, a `TOTAL` row closes
/// each section and a weights section follows.
pub(crate) fn render_table(
    n: OrderIndex,
    cohorts: &[CohortData],
    summary: Option<&CohortSummary>,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Order {n} retention by first-purchase month");
    let _ = writeln!(out);
    let _ = writeln!(out, "Customers placing order {n}, by months since order {}:", n.get() - 1);
    out.push_str(&header("COHORT"));
    for cohort in cohorts {
        out.push_str(&row(
            &cohort.cohort_month,
            u64::from(cohort.total_customers),
            &cohort.retention,
            ToString::to_string,
        ));
    }
    if let Some(summary) = summary {
        out.push_str(&row(
            "TOTAL",
            summary.grand_total_customers,
            &summary.totals,
            ToString::to_string,
        ));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Retention %:");
    out.push_str(&header("COHORT"));
    for cohort in cohorts {
        out.push_str(&row(
            &cohort.cohort_month,
            u64::from(cohort.total_customers),
            &cohort.retention_percentage,
            |p| format_pct(*p),
        ));
    }
    if let Some(summary) = summary {
        out.push_str(&row(
            "TOTAL",
            summary.grand_total_customers,
            &summary.total_percentage,
            |p| format_pct(*p),
        ));

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Share of all {} order-{n} events (%):",
            summary.grand_total_nth_orders
        );
        out.push_str(&header("COHORT"));
        for (weights, cohort) in summary.weights.iter().zip(cohorts) {
            out.push_str(&row(
                &weights.cohort_month,
                u64::from(cohort.total_customers),
                &weights.weight_percentage,
                |p| format_pct(*p),
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use ordercohort_core::{calculate_for_index, summarize_cohorts, RankedOrder};

    fn order(customer: &str, at: &str, rank: u32) -> RankedOrder {
        RankedOrder {
            customer_id: customer.to_string(),
            ordered_at: NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M:%S").expect("timestamp"),
            order_rank: rank,
        }
    }

    fn worked_example() -> Vec<CohortData> {
        let orders = vec![
            order("A", "2025-01-05 10:00:00", 1),
            order("A", "2025-01-20 10:00:00", 2),
            order("B", "2025-01-10 10:00:00", 1),
            order("B", "2025-03-01 10:00:00", 2),
            order("C", "2025-02-01 10:00:00", 1),
        ];
        calculate_for_index(&orders, OrderIndex::new(2).expect("n")).expect("cohorts")
    }

    #[test]
    fn format_pct_rounds_half_away_from_zero() {
        assert_eq!(format_pct(50.0), "50.0");
        assert_eq!(format_pct(100.0 / 3.0), "33.3");
        assert_eq!(format_pct(200.0 / 3.0), "66.7");
        assert_eq!(format_pct(0.25), "0.3");
        assert_eq!(format_pct(0.0), "0.0");
    }

    #[test]
    fn table_lists_each_cohort_with_rounded_percentages() {
        let cohorts = worked_example();
        let table = render_table(OrderIndex::new(2).expect("n"), &cohorts, None);

        assert!(table.contains("M12_PLUS"));
        let pct_rows: Vec<&str> = table
            .lines()
            .skip_while(|l| !l.starts_with("Retention %"))
            .filter(|l| l.starts_with("2025-"))
            .collect();
        assert_eq!(pct_rows.len(), 2);
        assert!(pct_rows[0].contains("50.0"));
        assert!(!table.contains("TOTAL"));
    }

    #[test]
    fn table_with_summary_has_total_rows_and_weights() {
        let cohorts = worked_example();
        let summary = summarize_cohorts(&cohorts);
        let table = render_table(OrderIndex::new(2).expect("n"), &cohorts, Some(&summary));

        assert_eq!(table.lines().filter(|l| l.starts_with("TOTAL")).count(), 2);
        assert!(table.contains("Share of all 2 order-2 events"));
    }

    #[test]
    fn json_keeps_unrounded_values() {
        let cohorts = worked_example();
        let json = render_json(OrderIndex::new(2).expect("n"), &cohorts, None).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");

        assert_eq!(value["n"].as_u64(), Some(2));
        assert!(value.get("summary").is_none());
        assert_eq!(value["cohorts"][0]["cohort_month"].as_str(), Some("2025-01"));
        assert_eq!(value["cohorts"][0]["retention_percentage"]["m2"].as_f64(), Some(50.0));
    }
}
