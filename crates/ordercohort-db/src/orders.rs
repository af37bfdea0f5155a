//! Ranked-order reads over `orders` and `order_line_items`.
//!
//! The ranker contract: every customer's orders come back with a dense,
//! 1-based `order_rank` in chronological order (ties broken by row id),
//! counted within the requested scope.

use chrono::NaiveDateTime;
use sqlx::PgPool;

use ordercohort_core::{
    ranked_orders_from_records, RankedOrder, RankedOrderRecord, RecordTimestamp,
};

use crate::DbError;

/// Raw ranked row as returned by Postgres, before contract validation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RankedOrderRow {
    pub customer_id: Option<String>,
    /// `created_at` converted to the reporting time zone.
    pub ordered_at: Option<NaiveDateTime>,
    pub order_rank: Option<i64>,
}

impl From<RankedOrderRow> for RankedOrderRecord {
    fn from(row: RankedOrderRow) -> Self {
        Self {
            customer_id: row.customer_id,
            ordered_at: row.ordered_at.map(RecordTimestamp::Local),
            order_rank: row.order_rank,
        }
    }
}

/// Which orders take part in the ranking.
///
/// Filters apply before ranking, so ranks are dense within the scope.
#[derive(Debug, Clone, Copy)]
pub struct RankedOrderScope<'a> {
    /// Case-insensitive substring of a line item's product title.
    pub product: Option<&'a str>,
    /// Calendar year of the order in `timezone`.
    pub year: Option<i32>,
    /// IANA zone the order timestamps are converted into.
    pub timezone: &'a str,
}

impl Default for RankedOrderScope<'_> {
    fn default() -> Self {
        Self {
            product: None,
            year: None,
            timezone: "UTC",
        }
    }
}

/// Fetch every in-scope order of every known customer, ranked per customer.
///
/// Orders without a customer and cancelled orders are skipped. An empty
/// result is not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails (including an unknown time
/// zone name), or [`DbError::MalformedRow`] if a row breaks the ranked-order
/// contract.
pub async fn fetch_ranked_orders(
    pool: &PgPool,
    scope: &RankedOrderScope<'_>,
) -> Result<Vec<RankedOrder>, DbError> {
    let product_pattern = scope.product.map(like_pattern);

    let rows = sqlx::query_as::<_, RankedOrderRow>(
        "SELECT \
             o.customer_id, \
             (o.created_at AT TIME ZONE $1) AS ordered_at, \
             ROW_NUMBER() OVER ( \
                 PARTITION BY o.customer_id ORDER BY o.created_at, o.id \
             ) AS order_rank \
         FROM orders o \
         WHERE o.customer_id IS NOT NULL \
           AND o.cancelled_at IS NULL \
           AND ($2::TEXT IS NULL OR EXISTS ( \
                 SELECT 1 FROM order_line_items li \
                 WHERE li.order_id = o.id AND li.product_title ILIKE $2)) \
           AND ($3::INT IS NULL \
                OR EXTRACT(YEAR FROM o.created_at AT TIME ZONE $1)::INT = $3) \
         ORDER BY o.customer_id, order_rank",
    )
    .bind(scope.timezone)
    .bind(product_pattern)
    .bind(scope.year)
    .fetch_all(pool)
    .await?;

    let orders = ranked_orders_from_records(rows.into_iter().map(RankedOrderRecord::from))?;
    Ok(orders)
}

/// Distinct calendar years (in `timezone`) that have rankable orders,
/// newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_order_years(pool: &PgPool, timezone: &str) -> Result<Vec<i32>, DbError> {
    let years = sqlx::query_scalar::<_, i32>(
        "SELECT DISTINCT EXTRACT(YEAR FROM created_at AT TIME ZONE $1)::INT AS year \
         FROM orders \
         WHERE customer_id IS NOT NULL AND cancelled_at IS NULL \
         ORDER BY year DESC",
    )
    .bind(timezone)
    .fetch_all(pool)
    .await?;

    Ok(years)
}

/// Distinct product titles seen on order line items, alphabetically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_titles(pool: &PgPool, limit: i64) -> Result<Vec<String>, DbError> {
    let titles = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT product_title \
         FROM order_line_items \
         ORDER BY product_title \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(titles)
}

/// Wrap a user-supplied fragment for `ILIKE`, escaping `%`, `_` and `\`.
fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("Serum"), "%Serum%");
        assert_eq!(like_pattern(" 50% off_x "), "%50\\% off\\_x%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn default_scope_is_unfiltered_utc() {
        let scope = RankedOrderScope::default();
        assert!(scope.product.is_none());
        assert!(scope.year.is_none());
        assert_eq!(scope.timezone, "UTC");
    }

    #[test]
    fn row_converts_into_record() {
        let at = NaiveDateTime::parse_from_str("2025-01-05 10:00:00", "%Y-%m-%d %H:%M:%S")
            .expect("timestamp");
        let record = RankedOrderRecord::from(RankedOrderRow {
            customer_id: Some("c-1".to_string()),
            ordered_at: Some(at),
            order_rank: Some(1),
        });
        assert_eq!(record.ordered_at, Some(RecordTimestamp::Local(at)));

        let order = record.into_ranked_order(0).expect("valid");
        assert_eq!(order.customer_id, "c-1");
        assert_eq!(order.order_rank, 1);
    }
}
