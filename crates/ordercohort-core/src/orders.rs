//! Ranked order records and the contract the order source must satisfy.
//!
//! The database ranks orders with a window function; [`rank_orders`] is the
//! in-memory equivalent used for file input. Either way the aggregator only
//! ever sees [`RankedOrder`]s that went through boundary validation.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::CohortError;

/// One order of one customer, tagged with its 1-based chronological rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedOrder {
    pub customer_id: String,
    /// Local wall-clock time of the order. Cohort months come from its
    /// calendar date as-is; no time zone conversion happens in the engine.
    pub ordered_at: NaiveDateTime,
    pub order_rank: u32,
}

impl RankedOrder {
    #[must_use]
    pub fn order_date(&self) -> NaiveDate {
        self.ordered_at.date()
    }
}

/// An order that has not been ranked yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOrderEvent {
    pub customer_id: String,
    pub ordered_at: NaiveDateTime,
    /// Tie-break for orders placed at the same instant (creation order).
    pub sequence: i64,
}

/// Timestamp as it arrives from a row or a JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordTimestamp {
    Local(NaiveDateTime),
    Text(String),
}

/// Nullable shape of a ranked order before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedOrderRecord {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub ordered_at: Option<RecordTimestamp>,
    #[serde(default)]
    pub order_rank: Option<i64>,
}

impl RankedOrderRecord {
    /// Validate the record into a [`RankedOrder`]. `index` is the record's
    /// position in its batch and is reported on failure.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::MalformedRecord`] when `customer_id` is missing
    /// or blank, `ordered_at` is missing or unparseable, or `order_rank` is
    /// missing or outside `1..=u32::MAX`.
    pub fn into_ranked_order(self, index: usize) -> Result<RankedOrder, CohortError> {
        let customer_id = self
            .customer_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let Some(customer_id) = customer_id else {
            return Err(CohortError::MalformedRecord {
                index,
                customer_id: None,
                reason: "missing customer_id".to_string(),
            });
        };

        let malformed = |reason: String| CohortError::MalformedRecord {
            index,
            customer_id: Some(customer_id.clone()),
            reason,
        };

        let ordered_at = match self.ordered_at {
            None => return Err(malformed("missing ordered_at".to_string())),
            Some(RecordTimestamp::Local(at)) => at,
            Some(RecordTimestamp::Text(raw)) => parse_ordered_at(&raw).map_err(malformed)?,
        };

        let order_rank = match self.order_rank {
            None => return Err(malformed("missing order_rank".to_string())),
            Some(rank) => u32::try_from(rank)
                .ok()
                .filter(|r| *r >= 1)
                .ok_or_else(|| malformed(format!("order_rank must be >= 1, got {rank}")))?,
        };

        Ok(RankedOrder {
            customer_id,
            ordered_at,
            order_rank,
        })
    }
}

/// Validate a batch of boundary records, failing on the first bad one.
///
/// # Errors
///
/// Returns [`CohortError::MalformedRecord`] naming the first invalid record.
pub fn ranked_orders_from_records<I>(records: I) -> Result<Vec<RankedOrder>, CohortError>
where
    I: IntoIterator<Item = RankedOrderRecord>,
{
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_ranked_order(index))
        .collect()
}

/// Parse an order timestamp.
///
/// Accepts RFC 3339 with an offset (the wall-clock time in that offset is
/// kept), naive `YYYY-MM-DDTHH:MM:SS[.fff]` or `YYYY-MM-DD HH:MM:SS[.fff]`,
/// and bare `YYYY-MM-DD` dates (midnight).
///
/// # Errors
///
/// Returns a human-readable reason when none of the formats match.
pub fn parse_ordered_at(raw: &str) -> Result<NaiveDateTime, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("empty ordered_at".to_string());
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.naive_local());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(at);
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| format!("unparseable ordered_at '{s}'"))
}

/// Rank orders per customer: ascending by `ordered_at`, ties broken by
/// `sequence`, ranks starting at 1.
///
/// Output is grouped by customer id (ascending) and then by rank.
#[must_use]
pub fn rank_orders(events: Vec<RawOrderEvent>) -> Vec<RankedOrder> {
    let mut by_customer: BTreeMap<String, Vec<(NaiveDateTime, i64)>> = BTreeMap::new();
    for event in events {
        by_customer
            .entry(event.customer_id)
            .or_default()
            .push((event.ordered_at, event.sequence));
    }

    let mut ranked = Vec::new();
    for (customer_id, mut orders) in by_customer {
        orders.sort_unstable();
        ranked.extend(
            (1_u32..)
                .zip(orders)
                .map(|(order_rank, (ordered_at, _))| RankedOrder {
                    customer_id: customer_id.clone(),
                    ordered_at,
                    order_rank,
                }),
        );
    }
    ranked
}

/// Check that every customer's ranks form the dense sequence `1..=K`.
///
/// Customers are checked in ascending id order so the reported violation is
/// stable regardless of input order.
///
/// # Errors
///
/// Returns [`CohortError::RankContract`] for the first customer whose ranks
/// contain a gap, a duplicate, or do not start at 1.
pub fn validate_ranked_orders(orders: &[RankedOrder]) -> Result<(), CohortError> {
    let mut ranks: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for order in orders {
        ranks
            .entry(order.customer_id.as_str())
            .or_default()
            .push(order.order_rank);
    }

    for (customer_id, mut customer_ranks) in ranks {
        customer_ranks.sort_unstable();
        check_dense_ranks(customer_id, customer_ranks.iter().copied())?;
    }
    Ok(())
}

/// Verify an ascending rank sequence is exactly `1, 2, ..., K`.
pub(crate) fn check_dense_ranks<I>(customer_id: &str, sorted_ranks: I) -> Result<(), CohortError>
where
    I: IntoIterator<Item = u32>,
{
    for (expected, actual) in (1_u32..).zip(sorted_ranks) {
        if actual != expected {
            let reason = if actual < expected {
                format!("duplicate order_rank {actual}")
            } else {
                format!("expected order_rank {expected}, found {actual}")
            };
            return Err(CohortError::RankContract {
                customer_id: customer_id.to_string(),
                reason,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "orders_test.rs"]
mod tests;
