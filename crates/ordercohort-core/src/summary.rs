//! Grand-total row and weight percentages over a computed cohort table.

use serde::{Deserialize, Serialize};

use crate::cohort::CohortData;
use crate::retention::{percentage, Retention};

/// Per-cohort share of all retained customers, bucket by bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortWeights {
    pub cohort_month: String,
    /// `retention[bucket] / grand_total_nth_orders * 100`.
    pub weight_percentage: Retention<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    /// Sum of `total_customers` across cohorts.
    pub grand_total_customers: u64,
    /// Sum of every retention bucket across cohorts.
    pub grand_total_nth_orders: u64,
    /// Per-bucket sums, i.e. the grand-total row.
    pub totals: Retention<u64>,
    /// `totals[bucket] / grand_total_customers * 100`.
    pub total_percentage: Retention<f64>,
    /// One entry per input cohort, in input order.
    pub weights: Vec<CohortWeights>,
}

/// Reduce a cohort table into its grand-total view.
#[must_use]
pub fn summarize_cohorts(cohorts: &[CohortData]) -> CohortSummary {
    let mut totals = Retention::<u64>::default();
    let mut grand_total_customers = 0_u64;

    for cohort in cohorts {
        grand_total_customers += u64::from(cohort.total_customers);
        for (bucket, count) in cohort.retention.iter() {
            *totals.get_mut(bucket) += u64::from(*count);
        }
    }

    let grand_total_nth_orders: u64 = totals.iter().map(|(_, sum)| *sum).sum();

    let total_percentage = totals.map(|_, sum| percentage(*sum, grand_total_customers));

    let weights = cohorts
        .iter()
        .map(|cohort| CohortWeights {
            cohort_month: cohort.cohort_month.clone(),
            weight_percentage: cohort
                .retention
                .map(|_, count| percentage(u64::from(*count), grand_total_nth_orders)),
        })
        .collect();

    CohortSummary {
        grand_total_customers,
        grand_total_nth_orders,
        totals,
        total_percentage,
        weights,
    }
}
