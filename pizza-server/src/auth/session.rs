//! JWT sessions and the `CurrentUser` extractor

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::User;
use thiserror::Error;

use super::access::Actor;
use crate::db;
use crate::state::AppState;

/// JWT claims for a signed-in user
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub email: String,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token generation failed: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Expired => AppError::token_expired(),
            SessionError::Invalid(_) => AppError::invalid_token("Invalid token"),
            SessionError::Encode(e) => {
                tracing::error!("JWT creation failed: {e}");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

pub fn create_token(
    user_id: i64,
    email: &str,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, SessionError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (now + chrono::Duration::hours(expiry_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, SessionError> {
    let validation = Validation::new(Algorithm::HS256);
    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => SessionError::Expired,
        _ => SessionError::Invalid(e.to_string()),
    })
}

/// Authenticated caller, freshly loaded from the database so role changes
/// apply on the next request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub actor: Actor,
}

impl CurrentUser {
    /// Resolve a raw token (header or `?token=` query) to the stored user
    pub async fn from_token(state: &AppState, token: &str) -> Result<Self, AppError> {
        let claims = verify_token(token, &state.config.jwt_secret).inspect_err(|e| {
            tracing::warn!(target: "security", event = "auth_failed", error = %e);
        })?;

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::invalid_token("Malformed JWT subject"))?;

        let user = db::users::find_by_id(&state.pool, user_id)
            .await
            .map_err(|e| {
                tracing::error!("DB error loading session user: {e}");
                AppError::new(ErrorCode::InternalError)
            })?
            .ok_or_else(AppError::not_authenticated)?;

        let actor = Actor::from(&user);
        Ok(Self { user, actor })
    }
}

fn bearer(parts: &Parts) -> Option<Result<&str, AppError>> {
    let header = parts.headers.get(http::header::AUTHORIZATION)?;
    Some(
        header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header")),
    )
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let Some(token) = bearer(parts) else {
            tracing::warn!(target: "security", event = "auth_missing", uri = %parts.uri);
            return Err(AppError::not_authenticated());
        };

        let user = Self::from_token(state, token?).await?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Public routes that behave differently for signed-in users. A missing
/// header means anonymous; a bad token is still rejected.
impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if bearer(parts).is_none() {
            return Ok(None);
        }
        <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-length-0123456789";

    #[test]
    fn token_round_trip() {
        let token = create_token(42, "ana@example.com", SECRET, 24).unwrap();
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "ana@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = create_token(42, "ana@example.com", SECRET, 24).unwrap();
        assert!(matches!(
            verify_token(&token, "another-secret"),
            Err(SessionError::Invalid(_))
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let token = create_token(42, "ana@example.com", SECRET, -2).unwrap();
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(SessionError::Expired)
        ));
    }

    #[test]
    fn session_errors_map_to_auth_codes() {
        let err: AppError = SessionError::Expired.into();
        assert_eq!(err.code, ErrorCode::TokenExpired);
        let err: AppError = SessionError::Invalid("bad".into()).into();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }
}
