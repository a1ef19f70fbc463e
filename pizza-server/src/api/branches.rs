use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{Branch, BranchCreate, BranchUpdate};

use super::{ApiResult, validate};
use crate::auth::CurrentUser;
use crate::db;
use crate::state::AppState;
use crate::util::{now_millis, snowflake_id};

fn branch_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::BranchNotFound).with_detail("id", id)
}

pub async fn list_branches(State(state): State<AppState>) -> ApiResult<Vec<Branch>> {
    let branches = db::branches::list_active(&state.pool).await?;
    Ok(Json(branches))
}

pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Branch> {
    let branch = db::branches::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| branch_not_found(id))?;
    Ok(Json(branch))
}

pub async fn create_branch(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(data): Json<BranchCreate>,
) -> ApiResult<Branch> {
    current.actor.require_admin()?;
    validate(&data)?;

    let branch = db::branches::create(&state.pool, snowflake_id(), &data, now_millis()).await?;
    tracing::info!(branch_id = branch.id, user_id = current.user.id, "Branch created");
    Ok(Json(branch))
}

pub async fn update_branch(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(data): Json<BranchUpdate>,
) -> ApiResult<Branch> {
    current.actor.require_super_admin()?;

    let branch = db::branches::update(&state.pool, id, &data, now_millis())
        .await?
        .ok_or_else(|| branch_not_found(id))?;
    tracing::info!(branch_id = id, is_active = branch.is_active, "Branch updated");
    Ok(Json(branch))
}
