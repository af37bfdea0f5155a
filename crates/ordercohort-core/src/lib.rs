//! Domain types and the cohort-retention engine for `ordercohort`.
//!
//! Everything in this crate is synchronous and free of I/O apart from
//! reading environment variables in [`load_app_config`].

pub mod app_config;
pub mod cohort;
pub mod config;
pub mod orders;
pub mod retention;
pub mod summary;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use cohort::{calculate_for_index, calculate_nth_order_cohort, CohortData, OrderIndex};
pub use config::{load_app_config, load_app_config_from_env};
pub use orders::{
    parse_ordered_at, rank_orders, ranked_orders_from_records, validate_ranked_orders,
    RankedOrder, RankedOrderRecord, RawOrderEvent, RecordTimestamp,
};
pub use retention::{percentage, Retention, RetentionBucket};
pub use summary::{summarize_cohorts, CohortSummary, CohortWeights};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Failures raised by the ranker contract and the cohort aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CohortError {
    /// The caller asked a question the engine cannot answer, e.g. `n < 2`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A boundary record is missing a field or carries an unparseable value.
    #[error(
        "malformed ranked order at record {index}{}: {reason}",
        customer_suffix(.customer_id.as_deref())
    )]
    MalformedRecord {
        index: usize,
        customer_id: Option<String>,
        reason: String,
    },

    /// A customer's ranks are not a dense chronological `1..K` sequence.
    #[error("rank contract violated for customer '{customer_id}': {reason}")]
    RankContract { customer_id: String, reason: String },
}

impl CohortError {
    /// `true` when the error points at bad data handed over by the order
    /// source rather than at the caller's arguments.
    #[must_use]
    pub fn is_upstream_data(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord { .. } | Self::RankContract { .. }
        )
    }
}

fn customer_suffix(customer_id: Option<&str>) -> String {
    customer_id.map_or_else(String::new, |id| format!(" (customer '{id}')"))
}
