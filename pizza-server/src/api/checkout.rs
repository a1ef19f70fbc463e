//! POST /api/checkout: price the cart, create the unpaid order, open a
//! Stripe Checkout Session

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{CheckoutCreate, Order, OrderStatus, PhaseTimes, ProgressBar};

use super::ApiResult;
use crate::auth::CurrentUser;
use crate::db;
use crate::error::BoxError;
use crate::pricing::{fee_from_cents, price_cart};
use crate::state::AppState;
use crate::stripe::{CheckoutRequest, CheckoutSession};
use crate::util::{now_millis, snowflake_id};

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
    pub order_id: i64,
}

pub async fn checkout(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CheckoutCreate>,
) -> ApiResult<CheckoutResponse> {
    if req.cart_products.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty).into());
    }

    let branch = db::branches::find_by_id(&state.pool, req.branch_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::BranchNotFound).with_detail("id", req.branch_id))?;
    if !branch.is_active {
        return Err(AppError::new(ErrorCode::BranchInactive).with_detail("id", branch.id).into());
    }

    let mut ids: Vec<i64> = req.cart_products.iter().map(|line| line.menu_item_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let items = db::menu_items::find_many(&state.pool, &ids).await?;

    let cart = price_cart(
        branch.id,
        &req.cart_products,
        &items,
        fee_from_cents(state.config.delivery_fee_cents),
    )?;

    let now = now_millis();
    let order = Order {
        id: snowflake_id(),
        branch_id: branch.id,
        user_email: current.user.email.clone(),
        address: req.address,
        cart_products: cart.lines,
        paid: false,
        status: OrderStatus::Pending,
        total_price: cart.total,
        progress_bar: ProgressBar {
            current_progress: 0,
            last_updated: now,
        },
        phase_times: PhaseTimes::default(),
        delivery_distance: String::new(),
        countdown: None,
        stripe_session_id: None,
        created_at: now,
        updated_at: now,
    };
    db::orders::create(&state.pool, &order).await?;

    let public_url = &state.config.public_url;
    let request = CheckoutRequest {
        order_id: order.id,
        customer_email: &order.user_email,
        lines: &order.cart_products,
        currency: &state.config.currency,
        delivery_fee_cents: state.config.delivery_fee_cents,
        success_url: format!("{public_url}orders/{}?clear-cart=1", order.id),
        cancel_url: format!("{public_url}cart?canceled=1"),
    };
    let session = session_or_discard(
        order.id,
        state.stripe.create_checkout_session(&request),
        db::orders::delete(&state.pool, order.id),
    )
    .await?;

    db::orders::set_stripe_session(&state.pool, order.id, &session.id).await?;

    tracing::info!(
        order_id = order.id,
        branch_id = order.branch_id,
        total = %order.total_price,
        "Checkout session created"
    );

    Ok(Json(CheckoutResponse {
        url: session.url,
        order_id: order.id,
    }))
}

/// Await the payment session. When the provider refuses, `discard` removes
/// the stored order so no unpayable order stays listed.
async fn session_or_discard(
    order_id: i64,
    open: impl Future<Output = Result<CheckoutSession, BoxError>>,
    discard: impl Future<Output = Result<bool, sqlx::Error>>,
) -> Result<CheckoutSession, AppError> {
    let err = match open.await {
        Ok(session) => return Ok(session),
        Err(e) => e,
    };
    tracing::error!(order_id, error = %err, "Stripe checkout session failed");

    if let Err(e) = discard.await {
        tracing::error!(order_id, error = %e, "Failed to discard order after checkout failure");
    }
    Err(AppError::new(ErrorCode::CheckoutSessionFailed))
}
