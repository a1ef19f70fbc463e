//! Server configuration

use crate::error::BoxError;

/// Server configuration, read from the environment (`.env` is loaded first)
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Public web origin with trailing slash, used for Stripe redirect URLs
    pub public_url: String,
    /// Allowed CORS origin. `None` allows any origin.
    pub cors_origin: Option<String>,
    /// ISO currency code sent to Stripe (lowercased on the wire)
    pub currency: String,
    /// Flat delivery fee in minor units
    pub delivery_fee_cents: i64,
    /// Distance Matrix key. Without it every estimate uses the fallback.
    pub google_maps_api_key: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(
        get: &dyn Fn(&str) -> Option<String>,
        name: &str,
        environment: &str,
    ) -> Result<String, BoxError> {
        let val = match get(name) {
            Some(v) => v,
            None => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Self::from_lookup(&|name| std::env::var(name).ok())
    }

    fn from_lookup(get: &dyn Fn(&str) -> Option<String>) -> Result<Self, BoxError> {
        let environment = get("ENVIRONMENT").unwrap_or_else(|| "development".into());

        let mut public_url = get("PUBLIC_URL").unwrap_or_else(|| "http://localhost:3000/".into());
        if !public_url.ends_with('/') {
            public_url.push('/');
        }

        Ok(Self {
            database_url: get("DATABASE_URL").ok_or("DATABASE_URL must be set")?,
            http_port: get("HTTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            public_url,
            cors_origin: get("CORS_ORIGIN").filter(|s| !s.is_empty()),
            currency: get("CURRENCY").unwrap_or_else(|| "PHP".into()),
            delivery_fee_cents: get("DELIVERY_FEE_CENTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
            google_maps_api_key: get("GOOGLE_MAPS_API_KEY").filter(|s| !s.is_empty()),
            jwt_secret: Self::require_secret(get, "JWT_SECRET", &environment)?,
            jwt_expiry_hours: get("JWT_EXPIRY_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            stripe_secret_key: Self::require_secret(get, "STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret(get, "STRIPE_WEBHOOK_SECRET", &environment)?,
            environment,
        })
    }
}
