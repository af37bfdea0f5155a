use std::path::Path;

use anyhow::Context;
use ordercohort_core::{
    parse_ordered_at, rank_orders, ranked_orders_from_records, RankedOrder, RankedOrderRecord,
    RawOrderEvent, RecordTimestamp,
};
use serde::Deserialize;

/// An order as listed in an unranked input file. `sequence` defaults to the
/// record's position in the file.
#[derive(Debug, Deserialize)]
struct UnrankedOrderRecord {
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    ordered_at: Option<RecordTimestamp>,
    #[serde(default)]
    sequence: Option<i64>,
}

impl UnrankedOrderRecord {
    fn into_event(self, index: usize) -> anyhow::Result<RawOrderEvent> {
        let customer_id = self
            .customer_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow::anyhow!("record {index}: missing customer_id"))?;

        let ordered_at = match self.ordered_at {
            None => anyhow::bail!("record {index} (customer '{customer_id}'): missing ordered_at"),
            Some(RecordTimestamp::Local(at)) => at,
            Some(RecordTimestamp::Text(raw)) => parse_ordered_at(&raw).map_err(|reason| {
                anyhow::anyhow!("record {index} (customer '{customer_id}'): {reason}")
            })?,
        };

        let sequence = match self.sequence {
            Some(sequence) => sequence,
            None => i64::try_from(index).context("record index overflows i64")?,
        };

        Ok(RawOrderEvent {
            customer_id,
            ordered_at,
            sequence,
        })
    }
}

/// Read a JSON array of orders from `path`.
///
/// Ranked files hold `{customer_id, ordered_at, order_rank}` records; with
/// `unranked` the records are `{customer_id, ordered_at, sequence?}` and are
/// ranked in memory.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a record is
/// malformed.
pub(crate) fn load_orders_from_file(
    path: &Path,
    unranked: bool,
) -> anyhow::Result<Vec<RankedOrder>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let orders = parse_orders(&raw, unranked)
        .with_context(|| format!("invalid order file {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        orders = orders.len(),
        unranked,
        "loaded orders from file"
    );
    Ok(orders)
}

fn parse_orders(raw: &str, unranked: bool) -> anyhow::Result<Vec<RankedOrder>> {
    if unranked {
        let records: Vec<UnrankedOrderRecord> = serde_json::from_str(raw)?;
        let events = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_event(index))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(rank_orders(events))
    } else {
        let records: Vec<RankedOrderRecord> = serde_json::from_str(raw)?;
        Ok(ranked_orders_from_records(records)?)
    }
}
