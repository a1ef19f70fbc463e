//! Order database operations
//!
//! Orders are stored flat (progress and countdown as columns); [`OrderRow`]
//! maps them back to the nested API model.

use rust_decimal::Decimal;
use shared::models::{
    CartLine, Countdown, DeliveryAddress, DeliveryTimeUpdate, Order, OrderStatus, PhaseTimes,
    ProgressBar,
};
use sqlx::{PgConnection, PgPool};
use sqlx::types::Json;

use crate::auth::OrderScope;
use crate::error::BoxError;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    branch_id: i64,
    user_email: String,
    phone: String,
    street_address: String,
    postal_code: String,
    city: String,
    province: String,
    cart_products: Json<Vec<CartLine>>,
    paid: bool,
    status: String,
    total_price: Decimal,
    current_progress: i32,
    progress_updated_at: i64,
    pending_time: Option<i32>,
    processing_time: Option<i32>,
    preparation_time: Option<i32>,
    delivering_time: Option<i32>,
    total_delivery_time: Option<i32>,
    estimated_delivery_time: Option<i32>,
    delivery_distance: String,
    countdown_current_time: Option<i64>,
    countdown_last_updated: Option<i64>,
    countdown_total_duration: Option<i64>,
    stripe_session_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = BoxError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let countdown = match (row.countdown_current_time, row.countdown_last_updated) {
            (Some(current_time), Some(last_updated)) => Some(Countdown {
                current_time,
                last_updated,
                total_duration: row.countdown_total_duration.unwrap_or(current_time),
            }),
            _ => None,
        };

        Ok(Order {
            id: row.id,
            branch_id: row.branch_id,
            user_email: row.user_email,
            address: DeliveryAddress {
                phone: row.phone,
                street_address: row.street_address,
                postal_code: row.postal_code,
                city: row.city,
                province: row.province,
            },
            cart_products: row.cart_products.0,
            paid: row.paid,
            status: row.status.parse::<OrderStatus>()?,
            total_price: row.total_price,
            progress_bar: ProgressBar {
                current_progress: row.current_progress,
                last_updated: row.progress_updated_at,
            },
            phase_times: PhaseTimes {
                pending_time: row.pending_time,
                processing_time: row.processing_time,
                preparation_time: row.preparation_time,
                delivering_time: row.delivering_time,
                total_delivery_time: row.total_delivery_time,
                estimated_delivery_time: row.estimated_delivery_time,
            },
            delivery_distance: row.delivery_distance,
            countdown,
            stripe_session_id: row.stripe_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn collect(rows: Vec<OrderRow>) -> Result<Vec<Order>, BoxError> {
    rows.into_iter().map(Order::try_from).collect()
}

/// Insert a fresh unpaid order
pub async fn create(pool: &PgPool, order: &Order) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, branch_id, user_email, phone, street_address, postal_code, city, province,
            cart_products, paid, status, total_price, current_progress, progress_updated_at,
            delivery_distance, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, FALSE, $10, $11, 0, $12, $13, $12, $12)
        "#,
    )
    .bind(order.id)
    .bind(order.branch_id)
    .bind(&order.user_email)
    .bind(&order.address.phone)
    .bind(&order.address.street_address)
    .bind(&order.address.postal_code)
    .bind(&order.address.city)
    .bind(&order.address.province)
    .bind(Json(&order.cart_products))
    .bind(order.status.as_str())
    .bind(order.total_price)
    .bind(order.created_at)
    .bind(&order.delivery_distance)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Order>, BoxError> {
    let row: Option<OrderRow> = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Order::try_from).transpose()
}

pub async fn list(pool: &PgPool, scope: &OrderScope) -> Result<Vec<Order>, BoxError> {
    let rows: Vec<OrderRow> = match scope {
        OrderScope::All => {
            sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?
        }
        OrderScope::Branch(branch_id) => {
            sqlx::query_as("SELECT * FROM orders WHERE branch_id = $1 ORDER BY created_at DESC")
                .bind(branch_id)
                .fetch_all(pool)
                .await?
        }
        OrderScope::Customer { email, branch_id } => {
            sqlx::query_as(
                "SELECT * FROM orders
                 WHERE user_email = $1 AND ($2::BIGINT IS NULL OR branch_id = $2)
                 ORDER BY created_at DESC",
            )
            .bind(email)
            .bind(branch_id)
            .fetch_all(pool)
            .await?
        }
        OrderScope::Nothing => Vec::new(),
    };
    collect(rows)
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_stripe_session(
    pool: &PgPool,
    id: i64,
    session_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET stripe_session_id = $2 WHERE id = $1")
        .bind(id)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Runs inside the webhook transaction. Returns `false` when the order is
/// missing or already paid
pub async fn mark_paid(conn: &mut PgConnection, id: i64, now: i64) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE orders SET paid = TRUE, updated_at = $2 WHERE id = $1 AND NOT paid")
            .bind(id)
            .bind(now)
            .execute(conn)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Status write guarded by the status the caller read.
///
/// Returns `None` when another writer moved the order first.
pub async fn transition_status(
    pool: &PgPool,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
    progress: i32,
    countdown: &Countdown,
    now: i64,
) -> Result<Option<Order>, BoxError> {
    let row: Option<OrderRow> = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = $3,
            current_progress = $4,
            progress_updated_at = $7,
            countdown_current_time = $5,
            countdown_last_updated = $7,
            countdown_total_duration = $6,
            updated_at = $7
        WHERE id = $1 AND status = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(progress)
    .bind(countdown.current_time)
    .bind(countdown.total_duration)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    row.map(Order::try_from).transpose()
}

pub async fn set_progress(
    pool: &PgPool,
    id: i64,
    progress: i32,
    now: i64,
) -> Result<Option<Order>, BoxError> {
    let row: Option<OrderRow> = sqlx::query_as(
        "UPDATE orders SET current_progress = $2, progress_updated_at = $3, updated_at = $3
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(progress)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    row.map(Order::try_from).transpose()
}

pub async fn set_countdown(
    pool: &PgPool,
    id: i64,
    countdown: &Countdown,
) -> Result<Option<Order>, BoxError> {
    let row: Option<OrderRow> = sqlx::query_as(
        "UPDATE orders SET
            countdown_current_time = $2,
            countdown_last_updated = $3,
            countdown_total_duration = $4,
            updated_at = $3
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(countdown.current_time)
    .bind(countdown.last_updated)
    .bind(countdown.total_duration)
    .fetch_optional(pool)
    .await?;
    row.map(Order::try_from).transpose()
}

pub async fn set_delivery_times(
    pool: &PgPool,
    id: i64,
    times: &DeliveryTimeUpdate,
    now: i64,
) -> Result<Option<Order>, BoxError> {
    let row: Option<OrderRow> = sqlx::query_as(
        r#"
        UPDATE orders SET
            total_delivery_time = $2,
            estimated_delivery_time = $2,
            preparation_time = COALESCE($3, preparation_time),
            delivering_time = COALESCE($4, delivering_time),
            pending_time = COALESCE($5, pending_time),
            processing_time = COALESCE($6, processing_time),
            updated_at = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(times.total_delivery_time)
    .bind(times.preparation_time)
    .bind(times.delivering_time)
    .bind(times.pending_time)
    .bind(times.processing_time)
    .bind(now)
    .fetch_optional(pool)
    .await?;
    row.map(Order::try_from).transpose()
}

/// `(created_at, total_price)` of paid orders, optionally for one branch
pub async fn paid_totals(
    pool: &PgPool,
    branch_id: Option<i64>,
) -> Result<Vec<(i64, Decimal)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT created_at, total_price FROM orders
         WHERE paid AND ($1::BIGINT IS NULL OR branch_id = $1)",
    )
    .bind(branch_id)
    .fetch_all(pool)
    .await
}
