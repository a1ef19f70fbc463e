//! Application state

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::RateLimiter;
use crate::config::Config;
use crate::delivery::DistanceClient;
use crate::error::BoxError;
use crate::live::OrderLiveHub;
use crate::stripe::StripeClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// Rate limiter for login/registration routes
    pub rate_limiter: RateLimiter,
    /// Per-order broadcast rooms for the live channel
    pub live: OrderLiveHub,
    pub stripe: StripeClient,
    pub distance: DistanceClient,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            pool,
            rate_limiter: RateLimiter::new(),
            live: OrderLiveHub::new(),
            stripe: StripeClient::new(http.clone(), config.stripe_secret_key.clone()),
            distance: DistanceClient::new(http, config.google_maps_api_key.clone()),
            config: Arc::new(config),
        })
    }
}
