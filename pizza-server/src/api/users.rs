use axum::Json;
use axum::extract::{Path, State};
use shared::error::{AppError, ErrorCode};
use shared::models::{User, UserProfile};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db;
use crate::state::AppState;
use crate::util::now_millis;

pub async fn list_users(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Vec<User>> {
    let scope = current.actor.user_scope()?;
    let users = db::users::list(&state.pool, scope).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<UserProfile> {
    let not_found = || AppError::new(ErrorCode::UserNotFound).with_detail("id", id);

    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)?;
    if !current.actor.can_view_user(&user) {
        tracing::warn!(target: "security", event = "user_hidden", user_id = current.user.id, target_id = id);
        return Err(not_found().into());
    }

    let info = db::users::find_or_create_info(&state.pool, &user.email, now_millis()).await?;
    Ok(Json(UserProfile::merge(user, info)))
}
