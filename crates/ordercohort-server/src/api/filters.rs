use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ProductFilterQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_years(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<i32>>>, ApiError> {
    let years = ordercohort_db::list_order_years(&state.pool, &state.reporting_timezone)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: years,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductFilterQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let titles = ordercohort_db::list_product_titles(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: titles,
        meta: ResponseMeta::new(req_id.0),
    }))
}
