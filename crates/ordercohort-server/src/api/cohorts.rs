use axum::{
    extract::{Query, State},
    Extension, Json,
};
use ordercohort_core::{
    calculate_for_index, summarize_cohorts, CohortData, CohortSummary, OrderIndex,
};
use ordercohort_db::RankedOrderScope;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_cohort_error, map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CohortQuery {
    /// Kept as text so `1.5` and friends get a validation error, not a
    /// query-string rejection.
    pub n: Option<String>,
    pub year: Option<i32>,
    pub product: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct NthOrderSummary {
    n: OrderIndex,
    cohorts: Vec<CohortData>,
    summary: CohortSummary,
}

pub(super) async fn nth_order_cohorts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CohortQuery>,
) -> Result<Json<ApiResponse<Vec<CohortData>>>, ApiError> {
    let (_, cohorts) = load_cohorts(&state, &req_id, &query).await?;

    Ok(Json(ApiResponse {
        data: cohorts,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn nth_order_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CohortQuery>,
) -> Result<Json<ApiResponse<NthOrderSummary>>, ApiError> {
    let (n, cohorts) = load_cohorts(&state, &req_id, &query).await?;
    let summary = summarize_cohorts(&cohorts);

    Ok(Json(ApiResponse {
        data: NthOrderSummary {
            n,
            cohorts,
            summary,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

async fn load_cohorts(
    state: &AppState,
    req_id: &RequestId,
    query: &CohortQuery,
) -> Result<(OrderIndex, Vec<CohortData>), ApiError> {
    let n = match query.n.as_deref() {
        Some(raw) => raw
            .parse::<OrderIndex>()
            .map_err(|e| map_cohort_error(req_id.0.clone(), &e))?,
        None => state.default_order_index,
    };

    let scope = RankedOrderScope {
        product: query.product.as_deref().filter(|p| !p.trim().is_empty()),
        year: query.year,
        timezone: &state.reporting_timezone,
    };

    let orders = ordercohort_db::fetch_ranked_orders(&state.pool, &scope)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let cohorts =
        calculate_for_index(&orders, n).map_err(|e| map_cohort_error(req_id.0.clone(), &e))?;

    tracing::info!(
        %n,
        year = ?scope.year,
        product = ?scope.product,
        orders = orders.len(),
        cohorts = cohorts.len(),
        "computed nth-order cohorts"
    );

    Ok((n, cohorts))
}
