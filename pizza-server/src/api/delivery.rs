use axum::Json;
use axum::extract::State;
use shared::error::AppError;

use super::ApiResult;
use crate::delivery::{DELIVERY_RANGES, DeliveryEstimate, DeliveryRange, EstimateRequest};
use crate::state::AppState;

pub async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<EstimateRequest>,
) -> ApiResult<DeliveryEstimate> {
    if req.origin.trim().is_empty() || req.destination.trim().is_empty() {
        return Err(AppError::validation("origin and destination are required").into());
    }
    Ok(Json(state.distance.estimate(&req.origin, &req.destination).await))
}

pub async fn ranges() -> Json<Vec<DeliveryRange>> {
    Json(DELIVERY_RANGES.to_vec())
}
