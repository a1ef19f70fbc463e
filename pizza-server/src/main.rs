//! pizza-server: multi-branch pizza ordering backend
//!
//! Long-running service that:
//! - Serves the menu of each branch (categories, items, sizes, extras)
//! - Prices carts and hands payment to Stripe Checkout
//! - Runs the back office for admins and staff (menu, users, order status)
//! - Pushes order progress and countdowns over a live WebSocket per order

mod api;
mod auth;
mod config;
mod db;
mod delivery;
mod error;
mod lifecycle;
mod live;
mod pricing;
mod sales;
mod state;
mod stripe;
mod util;

use std::net::SocketAddr;

use axum::http::HeaderValue;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use error::BoxError;
use state::AppState;

fn cors_layer(config: &Config) -> Result<CorsLayer, BoxError> {
    let origin = match &config.cors_origin {
        Some(origin) => AllowOrigin::exact(HeaderValue::from_str(origin)?),
        None => AllowOrigin::from(Any),
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pizza_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting pizza-server (env: {})", config.environment);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let cors = cors_layer(&config)?;

    // Initialize application state
    let state = AppState::new(config).await?;

    let app = api::create_router(state.clone()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("pizza-server HTTP listening on {http_addr}");

    // Peer address feeds the per-IP rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
