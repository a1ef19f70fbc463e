//! Own profile and editing other users
//!
//! GET /api/profile, PUT /api/profile

use axum::Json;
use axum::extract::State;
use shared::error::{AppError, ErrorCode};
use shared::models::{ProfileUpdate, UserProfile};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db;
use crate::state::AppState;
use crate::util::now_millis;

pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<UserProfile> {
    let info = db::users::find_or_create_info(&state.pool, &current.user.email, now_millis()).await?;
    Ok(Json(UserProfile::merge(current.user, info)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<UserProfile> {
    let now = now_millis();

    let target = match update.id {
        Some(id) if id != current.user.id => {
            let target = db::users::find_by_id(&state.pool, id)
                .await?
                .ok_or_else(|| AppError::new(ErrorCode::UserNotFound).with_detail("id", id))?;

            let change = current.actor.role_change_for(&target, &update)?;
            db::users::apply_role_change(&state.pool, target.id, change, now).await?;
            tracing::info!(
                editor_id = current.user.id,
                user_id = target.id,
                is_admin = ?change.is_admin,
                is_staff = ?change.is_staff,
                "User roles updated"
            );
            target
        }
        _ => current.user,
    };

    let user = db::users::update_basic(&state.pool, target.id, &update, now)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    let info = db::users::upsert_info(&state.pool, &user.email, &update, now).await?;

    Ok(Json(UserProfile::merge(user, info)))
}
