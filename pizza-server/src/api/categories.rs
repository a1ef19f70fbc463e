use axum::Json;
use axum::extract::{Path, Query, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{Category, CategoryCreate, CategoryUpdate};

use super::{ApiResult, BranchQuery};
use crate::auth::{CurrentUser, menu_scope};
use crate::db;
use crate::state::AppState;
use crate::util::{now_millis, snowflake_id};

fn category_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::CategoryNotFound).with_detail("id", id)
}

fn require_name(name: &str) -> Result<&str, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "Category name is required",
        ));
    }
    Ok(name)
}

async fn load(state: &AppState, id: i64) -> Result<Category, crate::error::ServiceError> {
    Ok(db::categories::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| category_not_found(id))?)
}

pub async fn list_categories(
    State(state): State<AppState>,
    current: Option<CurrentUser>,
    Query(query): Query<BranchQuery>,
) -> ApiResult<Vec<Category>> {
    let scope = menu_scope(current.as_ref().map(|c| &c.actor), query.branch_id);
    let categories = db::categories::list(&state.pool, scope).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(data): Json<CategoryCreate>,
) -> ApiResult<Category> {
    current.actor.require_administers(data.branch_id)?;
    let name = require_name(&data.name)?;

    db::branches::find_by_id(&state.pool, data.branch_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::BranchNotFound).with_detail("id", data.branch_id))?;

    let category =
        db::categories::create(&state.pool, snowflake_id(), name, data.branch_id, now_millis()).await?;
    tracing::info!(category_id = category.id, branch_id = category.branch_id, "Category created");
    Ok(Json(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(data): Json<CategoryUpdate>,
) -> ApiResult<Category> {
    let category = load(&state, id).await?;
    current.actor.require_administers(category.branch_id)?;
    let name = require_name(&data.name)?;

    let category = db::categories::rename(&state.pool, id, name, now_millis())
        .await?
        .ok_or_else(|| category_not_found(id))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<bool> {
    let category = load(&state, id).await?;
    current.actor.require_administers(category.branch_id)?;

    let deleted = db::categories::delete(&state.pool, id).await?;
    tracing::info!(category_id = id, "Category deleted");
    Ok(Json(deleted))
}
