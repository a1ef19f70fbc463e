//! Registration and credentials login
//!
//! POST /api/register, POST /api/auth/login

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::User;
use validator::Validate;

use super::{ApiResult, validate};
use crate::auth::session::create_token;
use crate::db;
use crate::state::AppState;
use crate::util::{hash_password, now_millis, snowflake_id, verify_password};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub user: RegisteredUser,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    let req = RegisterRequest {
        email: normalize_email(&req.email),
        password: req.password,
    };
    if req.email.is_empty() {
        return Err(AppError::with_message(ErrorCode::RequiredField, "Email is required").into());
    }
    if req.password.chars().count() < 5 {
        return Err(AppError::new(ErrorCode::PasswordTooShort).into());
    }
    validate(&req)?;

    let hashed = hash_password(&req.password).map_err(|e| {
        tracing::error!("Password hash error: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;

    let user = db::users::create(&state.pool, snowflake_id(), &req.email, &hashed, now_millis())
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::EmailAlreadyExists))?;

    tracing::info!(user_id = user.id, "User registered");

    Ok(Json(RegisterResponse {
        success: true,
        user: RegisteredUser {
            id: user.id,
            email: user.email,
        },
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let email = normalize_email(&req.email);

    let Some(user) = db::users::find_by_email(&state.pool, &email).await? else {
        tracing::warn!(target: "security", event = "login_failed", reason = "unknown_email");
        return Err(AppError::invalid_credentials().into());
    };

    let password_hash = match (&user.password_hash, user.google_auth) {
        (Some(hash), false) => hash,
        _ => {
            tracing::warn!(target: "security", event = "login_failed", user_id = user.id, reason = "external_account");
            return Err(AppError::new(ErrorCode::ExternalSignInAccount).into());
        }
    };

    if !verify_password(&req.password, password_hash) {
        tracing::warn!(target: "security", event = "login_failed", user_id = user.id, reason = "bad_password");
        return Err(AppError::invalid_credentials().into());
    }

    let token = create_token(
        user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )
    .map_err(AppError::from)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(LoginResponse { token, user }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_payload_rules() {
        let ok = RegisterRequest {
            email: "ana@example.com".into(),
            password: "12345".into(),
        };
        assert!(validate(&ok).is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            password: "12345".into(),
        };
        let err = validate(&bad_email).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.details.as_ref().is_some_and(|d| d.contains_key("email")));
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
