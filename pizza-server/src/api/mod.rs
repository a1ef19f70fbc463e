//! API routes for pizza-server

pub mod auth;
pub mod branches;
pub mod categories;
pub mod checkout;
pub mod delivery;
pub mod health;
pub mod live_ws;
pub mod menu_items;
pub mod orders;
pub mod profile;
pub mod sales;
pub mod stripe_webhook;
pub mod users;

use axum::routing::{get, patch, post, put};
use axum::{Json, Router, middleware};
use serde::Deserialize;
use shared::error::AppError;
use validator::Validate;

use crate::auth::rate_limit::{login_rate_limit, register_rate_limit};
use crate::error::ServiceError;
use crate::state::AppState;

pub(crate) type ApiResult<T> = Result<Json<T>, ServiceError>;

/// `?branch_id=` filter shared by listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct BranchQuery {
    pub branch_id: Option<i64>,
}

/// Run `validator` rules, reporting the first message per field
pub(crate) fn validate<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|errors| {
        let mut err = AppError::validation("Invalid request payload");
        for (field, field_errors) in errors.field_errors() {
            let message = field_errors
                .first()
                .and_then(|e| e.message.as_ref())
                .map_or_else(|| "invalid value".to_string(), |m| m.to_string());
            err = err.with_detail(field.to_string(), message);
        }
        err
    })
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Credential endpoints (per-IP rate limited)
    let login = Router::new()
        .route("/api/auth/login", post(auth::login))
        .layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));
    let registration = Router::new()
        .route("/api/register", post(auth::register))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            register_rate_limit,
        ));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    let menu = Router::new()
        .route(
            "/api/branches",
            get(branches::list_branches).post(branches::create_branch),
        )
        .route(
            "/api/branches/{id}",
            get(branches::get_branch).put(branches::update_branch),
        )
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route(
            "/api/menu-items",
            get(menu_items::list_menu_items).post(menu_items::create_menu_item),
        )
        .route(
            "/api/menu-items/{id}",
            get(menu_items::get_menu_item)
                .put(menu_items::update_menu_item)
                .delete(menu_items::delete_menu_item),
        )
        .route(
            "/api/menu-items/{id}/availability",
            patch(menu_items::set_availability),
        )
        .route(
            "/api/menu-items/{id}/discount",
            put(menu_items::set_discount),
        );

    let orders = Router::new()
        .route("/api/checkout", post(checkout::checkout))
        .route("/api/orders", get(orders::list_orders))
        .route(
            "/api/orders/{id}",
            get(orders::get_order).delete(orders::delete_order),
        )
        .route("/api/orders/{id}/status", post(orders::update_status))
        .route("/api/orders/{id}/progress", post(orders::update_progress))
        .route("/api/orders/{id}/countdown", post(orders::start_countdown))
        .route(
            "/api/orders/{id}/delivery-time",
            post(orders::update_delivery_time),
        )
        .route("/api/orders/{id}/live", get(live_ws::handle_live_ws));

    let accounts = Router::new()
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/users", get(users::list_users))
        .route("/api/users/{id}", get(users::get_user))
        .route("/api/sales", get(sales::get_sales));

    let delivery = Router::new()
        .route("/api/delivery/estimate", post(delivery::estimate))
        .route("/api/delivery/ranges", get(delivery::ranges));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(login)
        .merge(registration)
        .merge(webhook)
        .merge(menu)
        .merge(orders)
        .merge(accounts)
        .merge(delivery)
        .with_state(state)
}
