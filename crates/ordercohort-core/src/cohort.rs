//! N-th order cohort retention.
//!
//! Customers are grouped by the calendar month of their first order. Within
//! each cohort, every customer who placed at least `n - 1` orders counts
//! towards `total_customers`; those who also placed an `n`-th order land in
//! the bucket for the calendar-month gap between order `n - 1` and order `n`.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::orders::{check_dense_ranks, RankedOrder};
use crate::retention::{percentage, Retention, RetentionBucket};
use crate::CohortError;

/// A validated order index: the `n` in "retention to the n-th order".
///
/// Always at least 2, since retention to the first order has no preceding
/// order to measure from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct OrderIndex(u32);

impl OrderIndex {
    pub const MIN: u32 = 2;

    /// # Errors
    ///
    /// Returns [`CohortError::InvalidArgument`] when `n < 2` or `n` does not
    /// fit in a `u32`.
    pub fn new(n: i64) -> Result<Self, CohortError> {
        if n < i64::from(Self::MIN) {
            return Err(CohortError::InvalidArgument(format!(
                "order index must be an integer >= {}, got {n}",
                Self::MIN
            )));
        }
        u32::try_from(n).map(Self).map_err(|_| {
            CohortError::InvalidArgument(format!(
                "order index {n} exceeds the supported maximum of {}",
                u32::MAX
            ))
        })
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Number of orders a customer needs to join the base cohort.
    fn required_orders(self) -> usize {
        self.nth_orders() - 1
    }

    /// Number of orders a customer needs to count as retained.
    fn nth_orders(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl TryFrom<i64> for OrderIndex {
    type Error = CohortError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl FromStr for OrderIndex {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let n = trimmed.parse::<i64>().map_err(|_| {
            CohortError::InvalidArgument(format!(
                "order index must be an integer >= {}, got '{trimmed}'",
                Self::MIN
            ))
        })?;
        Self::new(n)
    }
}

impl std::fmt::Display for OrderIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Retention table row for one first-purchase month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortData {
    /// `"YYYY-MM"` of the customers' first order.
    pub cohort_month: String,
    /// Customers in this cohort with at least `n - 1` orders.
    pub total_customers: u32,
    pub retention: Retention<u32>,
    /// `retention[bucket] / total_customers * 100`, unrounded.
    pub retention_percentage: Retention<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProcessedOrder {
    rank: u32,
    date: NaiveDate,
}

#[derive(Debug)]
struct CohortMembership {
    cohort_month: String,
    previous_order_date: NaiveDate,
}

#[derive(Debug)]
struct NthOrderEvent {
    previous_order_date: NaiveDate,
    nth_order_date: NaiveDate,
}

#[derive(Debug, Default)]
struct CohortAccumulator {
    total_customers: u32,
    retention: Retention<u32>,
}

impl CohortAccumulator {
    fn finish(self, cohort_month: String) -> CohortData {
        let total = u64::from(self.total_customers);
        let retention_percentage = self
            .retention
            .map(|_, count| percentage(u64::from(*count), total));
        CohortData {
            cohort_month,
            total_customers: self.total_customers,
            retention: self.retention,
            retention_percentage,
        }
    }
}

/// Compute the `n`-th order retention table.
///
/// Input rows may arrive in any order; output is sorted ascending by
/// `cohort_month`. An empty input yields an empty table.
///
/// # Errors
///
/// - [`CohortError::InvalidArgument`] when `n < 2`.
/// - [`CohortError::RankContract`] when a customer's ranks are not dense
///   `1..=K`, or their `n`-th order is dated before order `n - 1`.
pub fn calculate_nth_order_cohort(
    ranked_orders: &[RankedOrder],
    n: i64,
) -> Result<Vec<CohortData>, CohortError> {
    calculate_for_index(ranked_orders, OrderIndex::new(n)?)
}

/// [`calculate_nth_order_cohort`] for an already-validated order index.
///
/// # Errors
///
/// Returns [`CohortError::RankContract`] when a customer's ranks are not
/// dense `1..=K`, or their `n`-th order is dated before order `n - 1`.
pub fn calculate_for_index(
    ranked_orders: &[RankedOrder],
    n: OrderIndex,
) -> Result<Vec<CohortData>, CohortError> {
    let by_customer = group_by_customer(ranked_orders)?;

    // BTreeMap keeps "YYYY-MM" keys in chronological order.
    let mut cohorts: BTreeMap<String, CohortAccumulator> = BTreeMap::new();

    for (customer_id, orders) in &by_customer {
        let Some(membership) = cohort_membership(orders, n) else {
            continue;
        };

        let nth_event = nth_order_event(orders, n, membership.previous_order_date);
        let cohort = cohorts.entry(membership.cohort_month).or_default();
        cohort.total_customers += 1;

        let Some(event) = nth_event else {
            continue;
        };

        let out_of_order = || CohortError::RankContract {
            customer_id: (*customer_id).to_string(),
            reason: format!(
                "order {} on {} precedes order {} on {}",
                n,
                event.nth_order_date,
                n.get() - 1,
                event.previous_order_date
            ),
        };
        if event.nth_order_date < event.previous_order_date {
            return Err(out_of_order());
        }

        let diff = month_diff(event.previous_order_date, event.nth_order_date);
        let bucket = RetentionBucket::from_month_diff(diff).ok_or_else(out_of_order)?;
        *cohort.retention.get_mut(bucket) += 1;
    }

    Ok(cohorts
        .into_iter()
        .map(|(month, cohort)| cohort.finish(month))
        .collect())
}

/// Group orders per customer, sorted by rank, and enforce dense ranks.
fn group_by_customer(
    ranked_orders: &[RankedOrder],
) -> Result<BTreeMap<&str, Vec<ProcessedOrder>>, CohortError> {
    let mut by_customer: BTreeMap<&str, Vec<ProcessedOrder>> = BTreeMap::new();
    for order in ranked_orders {
        by_customer
            .entry(order.customer_id.as_str())
            .or_default()
            .push(ProcessedOrder {
                rank: order.order_rank,
                date: order.order_date(),
            });
    }

    for (customer_id, orders) in &mut by_customer {
        orders.sort_by_key(|o| o.rank);
        check_dense_ranks(customer_id, orders.iter().map(|o| o.rank))?;
    }

    Ok(by_customer)
}

fn cohort_membership(orders: &[ProcessedOrder], n: OrderIndex) -> Option<CohortMembership> {
    if orders.len() < n.required_orders() {
        return None;
    }
    let first = orders.first()?;
    let previous = orders.get(n.required_orders() - 1)?;
    Some(CohortMembership {
        cohort_month: first.date.format("%Y-%m").to_string(),
        previous_order_date: previous.date,
    })
}

fn nth_order_event(
    orders: &[ProcessedOrder],
    n: OrderIndex,
    previous_order_date: NaiveDate,
) -> Option<NthOrderEvent> {
    let nth = orders.get(n.nth_orders() - 1)?;
    Some(NthOrderEvent {
        previous_order_date,
        nth_order_date: nth.date,
    })
}

/// Calendar-month difference, ignoring day of month.
fn month_diff(from: NaiveDate, to: NaiveDate) -> i32 {
    month_ordinal(to) - month_ordinal(from)
}

#[allow(clippy::cast_possible_wrap)] // month0() is 0..=11
fn month_ordinal(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

#[cfg(test)]
#[path = "cohort_test.rs"]
mod tests;
