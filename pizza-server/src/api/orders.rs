//! Orders and their fulfilment lifecycle
//!
//! Every mutation is persisted first and then pushed to the order's live
//! room; a socket that misses the push resyncs from the stored countdown.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::live::LiveMessage;
use shared::models::{
    Countdown, CountdownStart, DeliveryTimeUpdate, Order, OrderStatus, OrderView, ProgressUpdate,
    StatusUpdate,
};
use sqlx::PgPool;

use super::{ApiResult, BranchQuery};
use crate::auth::{Actor, CurrentUser};
use crate::db;
use crate::error::{BoxError, ServiceResult};
use crate::lifecycle::{self, Transition, plan_transition};
use crate::live::{OrderLiveHub, countdown_message};
use crate::state::AppState;
use crate::util::now_millis;

/// Phase estimates above this many minutes are rejected
const MAX_PHASE_MINUTES: i32 = 24 * 60;

fn order_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::OrderNotFound).with_detail("id", id)
}

pub(crate) async fn load(state: &AppState, id: i64) -> ServiceResult<Order> {
    Ok(db::orders::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| order_not_found(id))?)
}

/// Load an order the actor may see. Hidden orders answer 404.
pub(crate) async fn load_visible(state: &AppState, actor: &Actor, id: i64) -> ServiceResult<Order> {
    let order = load(state, id).await?;
    if !actor.can_view_order(order.branch_id, &order.user_email) {
        tracing::warn!(target: "security", event = "order_hidden", user_id = actor.user_id, order_id = id);
        return Err(order_not_found(id).into());
    }
    Ok(order)
}

/// Conditional order writes, backed by `PgPool`
trait OrderWrites {
    /// `None` when the stored status no longer equals `plan.from`
    async fn transition_status(
        &self,
        id: i64,
        plan: &Transition,
        now: i64,
    ) -> Result<Option<Order>, BoxError>;
    async fn set_countdown(
        &self,
        id: i64,
        countdown: &Countdown,
    ) -> Result<Option<Order>, BoxError>;
}

impl OrderWrites for PgPool {
    async fn transition_status(
        &self,
        id: i64,
        plan: &Transition,
        now: i64,
    ) -> Result<Option<Order>, BoxError> {
        db::orders::transition_status(self, id, plan.from, plan.to, plan.progress, &plan.countdown, now)
            .await
    }

    async fn set_countdown(
        &self,
        id: i64,
        countdown: &Countdown,
    ) -> Result<Option<Order>, BoxError> {
        db::orders::set_countdown(self, id, countdown).await
    }
}

/// Move an order forward and broadcast the new status and countdown
pub(crate) async fn apply_status(
    state: &AppState,
    order: &Order,
    to: OrderStatus,
) -> ServiceResult<Order> {
    change_status(&state.pool, &state.live, order, to, now_millis()).await
}

/// Persist an explicit countdown and broadcast it
pub(crate) async fn apply_countdown(
    state: &AppState,
    order: &Order,
    total_seconds: i64,
    total_duration: Option<i64>,
) -> ServiceResult<Order> {
    change_countdown(
        &state.pool,
        &state.live,
        order,
        total_seconds,
        total_duration,
        now_millis(),
    )
    .await
}

async fn change_status<W: OrderWrites>(
    writes: &W,
    live: &OrderLiveHub,
    order: &Order,
    to: OrderStatus,
    now: i64,
) -> ServiceResult<Order> {
    let plan = plan_transition(order, to, now)?;

    let updated = writes
        .transition_status(order.id, &plan, now)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::OrderStatusConflict)
                .with_detail("id", order.id)
                .with_detail("expected", plan.from.as_str())
        })?;

    tracing::info!(order_id = order.id, from = %plan.from, to = %plan.to, "Order status changed");

    live.publish(
        order.id,
        LiveMessage::StatusChanged {
            status: updated.status,
            progress: updated.progress_bar.current_progress,
        },
    );
    live.publish(order.id, countdown_message(&plan.countdown, now));
    Ok(updated)
}

async fn change_countdown<W: OrderWrites>(
    writes: &W,
    live: &OrderLiveHub,
    order: &Order,
    total_seconds: i64,
    total_duration: Option<i64>,
    now: i64,
) -> ServiceResult<Order> {
    let countdown =
        lifecycle::start_countdown(total_seconds, total_duration, order.countdown.as_ref(), now);

    let updated = writes
        .set_countdown(order.id, &countdown)
        .await?
        .ok_or_else(|| order_not_found(order.id))?;

    live.publish(order.id, countdown_message(&countdown, now));
    Ok(updated)
}

/// Optional status move, then the countdown. A status conflict writes nothing.
async fn countdown_with_status<W: OrderWrites>(
    writes: &W,
    live: &OrderLiveHub,
    mut order: Order,
    req: &CountdownStart,
    now: i64,
) -> ServiceResult<Order> {
    if let Some(status) = req.status
        && status != order.status
    {
        order = change_status(writes, live, &order, status, now).await?;
    }
    change_countdown(writes, live, &order, req.total_seconds, req.total_duration, now).await
}

pub async fn list_orders(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<BranchQuery>,
) -> ApiResult<Vec<OrderView>> {
    let scope = current.actor.order_scope(query.branch_id);
    let now = now_millis();
    let orders = db::orders::list(&state.pool, &scope).await?;
    Ok(Json(orders.into_iter().map(|o| o.into_view(now)).collect()))
}

pub async fn get_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<OrderView> {
    let order = load_visible(&state, &current.actor, id).await?;
    Ok(Json(order.into_view(now_millis())))
}

pub async fn delete_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<bool> {
    let order = load(&state, id).await?;
    current.actor.require_manages_orders_of(order.branch_id)?;

    let deleted = db::orders::delete(&state.pool, id).await?;
    tracing::info!(order_id = id, user_id = current.user.id, "Order deleted");
    Ok(Json(deleted))
}

pub async fn update_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<StatusUpdate>,
) -> ApiResult<OrderView> {
    let order = load(&state, id).await?;
    current.actor.require_manages_orders_of(order.branch_id)?;

    let updated = apply_status(&state, &order, req.status).await?;
    Ok(Json(updated.into_view(now_millis())))
}

pub async fn update_progress(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<ProgressUpdate>,
) -> ApiResult<OrderView> {
    load_visible(&state, &current.actor, id).await?;

    let progress = lifecycle::clamp_progress(req.progress);
    let now = now_millis();
    let updated = db::orders::set_progress(&state.pool, id, progress, now)
        .await?
        .ok_or_else(|| order_not_found(id))?;

    state.live.publish(id, LiveMessage::ProgressUpdated { progress });
    Ok(Json(updated.into_view(now)))
}

#[derive(Debug, Serialize)]
pub struct CountdownResponse {
    pub success: bool,
    pub remaining_time: i64,
    pub countdown: Option<Countdown>,
}

pub async fn start_countdown(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<CountdownStart>,
) -> ApiResult<CountdownResponse> {
    let order = load(&state, id).await?;
    current.actor.require_manages_orders_of(order.branch_id)?;

    let now = now_millis();
    let updated = countdown_with_status(&state.pool, &state.live, order, &req, now).await?;
    Ok(Json(CountdownResponse {
        success: true,
        remaining_time: updated.remaining_time(now),
        countdown: updated.countdown,
    }))
}

fn check_minutes(field: &'static str, minutes: Option<i32>) -> Result<(), AppError> {
    match minutes {
        Some(m) if !(0..=MAX_PHASE_MINUTES).contains(&m) => Err(AppError::new(
            ErrorCode::ValueOutOfRange,
        )
        .with_detail(field, m)),
        _ => Ok(()),
    }
}

pub async fn update_delivery_time(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(req): Json<DeliveryTimeUpdate>,
) -> ApiResult<OrderView> {
    let order = load(&state, id).await?;
    current.actor.require_manages_orders_of(order.branch_id)?;

    check_minutes("total_delivery_time", Some(req.total_delivery_time))?;
    check_minutes("preparation_time", req.preparation_time)?;
    check_minutes("delivering_time", req.delivering_time)?;
    check_minutes("pending_time", req.pending_time)?;
    check_minutes("processing_time", req.processing_time)?;

    let now = now_millis();
    let updated = db::orders::set_delivery_times(&state.pool, id, &req, now)
        .await?
        .ok_or_else(|| order_not_found(id))?;
    tracing::info!(order_id = id, total = req.total_delivery_time, "Delivery time updated");
    Ok(Json(updated.into_view(now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use rust_decimal::Decimal;
    use shared::models::{DeliveryAddress, PhaseTimes, ProgressBar};
    use std::sync::Mutex;
    use tokio::sync::broadcast::error::TryRecvError;

    const NOW: i64 = 1_700_000_000_000;

    /// One stored row; writes match on id and, for status, on `plan.from`
    struct MemoryOrders {
        row: Mutex<Order>,
        writes: Mutex<Vec<&'static str>>,
    }

    impl MemoryOrders {
        fn new(order: Order) -> Self {
            Self {
                row: Mutex::new(order),
                writes: Mutex::default(),
            }
        }

        fn stored(&self) -> Order {
            self.row.lock().unwrap().clone()
        }

        fn writes(&self) -> Vec<&'static str> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl OrderWrites for MemoryOrders {
        async fn transition_status(
            &self,
            id: i64,
            plan: &Transition,
            now: i64,
        ) -> Result<Option<Order>, BoxError> {
            let mut row = self.row.lock().unwrap();
            if row.id != id || row.status != plan.from {
                return Ok(None);
            }
            row.status = plan.to;
            row.progress_bar = ProgressBar {
                current_progress: plan.progress,
                last_updated: now,
            };
            row.countdown = Some(plan.countdown);
            row.updated_at = now;
            self.writes.lock().unwrap().push("status");
            Ok(Some(row.clone()))
        }

        async fn set_countdown(
            &self,
            id: i64,
            countdown: &Countdown,
        ) -> Result<Option<Order>, BoxError> {
            let mut row = self.row.lock().unwrap();
            if row.id != id {
                return Ok(None);
            }
            row.countdown = Some(*countdown);
            self.writes.lock().unwrap().push("countdown");
            Ok(Some(row.clone()))
        }
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: 1,
            branch_id: 1,
            user_email: "a@example.com".into(),
            address: DeliveryAddress::default(),
            cart_products: vec![],
            paid: true,
            status,
            total_price: Decimal::ZERO,
            progress_bar: ProgressBar::default(),
            phase_times: PhaseTimes::default(),
            delivery_distance: String::new(),
            countdown: None,
            stripe_session_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn countdown_request(status: Option<OrderStatus>) -> CountdownStart {
        CountdownStart {
            total_seconds: 600,
            total_duration: None,
            status,
        }
    }

    fn expect_conflict(result: ServiceResult<Order>) -> AppError {
        match result {
            Err(ServiceError::App(err)) => {
                assert_eq!(err.code, ErrorCode::OrderStatusConflict);
                err
            }
            other => panic!("expected a status conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_write_broadcasts_status_then_countdown() {
        let store = MemoryOrders::new(order(OrderStatus::Pending));
        let live = OrderLiveHub::new();
        let mut rx = live.subscribe(1);

        let updated = change_status(&store, &live, &store.stored(), OrderStatus::Processing, NOW)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Processing);
        assert_eq!(updated.progress_bar.current_progress, 20);

        assert_eq!(
            rx.try_recv().unwrap(),
            LiveMessage::StatusChanged {
                status: OrderStatus::Processing,
                progress: 20,
            }
        );
        // processing + preparation + delivering at the default estimates
        assert_eq!(
            rx.try_recv().unwrap(),
            LiveMessage::CountdownUpdate {
                remaining_time: 35 * 60,
                start_time: NOW,
            }
        );
    }

    #[tokio::test]
    async fn stale_status_write_is_a_conflict() {
        // Another manager already moved the order on
        let store = MemoryOrders::new(order(OrderStatus::Processing));
        let live = OrderLiveHub::new();
        let mut rx = live.subscribe(1);
        let snapshot = order(OrderStatus::Pending);

        let err = expect_conflict(
            change_status(&store, &live, &snapshot, OrderStatus::Preparing, NOW).await,
        );
        assert_eq!(err.details.unwrap()["expected"], "Pending");

        assert_eq!(store.stored().status, OrderStatus::Processing);
        assert!(store.writes().is_empty());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn countdown_start_moves_status_first() {
        let store = MemoryOrders::new(order(OrderStatus::Pending));
        let live = OrderLiveHub::new();
        let req = countdown_request(Some(OrderStatus::Preparing));

        let updated = countdown_with_status(&store, &live, store.stored(), &req, NOW)
            .await
            .unwrap();
        assert_eq!(store.writes(), ["status", "countdown"]);
        assert_eq!(updated.status, OrderStatus::Preparing);

        let countdown = updated.countdown.unwrap();
        assert_eq!(countdown.current_time, 600);
        // Scale set by the status move is kept
        assert_eq!(countdown.total_duration, 30 * 60);
    }

    #[tokio::test]
    async fn same_status_only_restarts_countdown() {
        let store = MemoryOrders::new(order(OrderStatus::Pending));
        let live = OrderLiveHub::new();
        let req = countdown_request(Some(OrderStatus::Pending));

        let updated = countdown_with_status(&store, &live, store.stored(), &req, NOW)
            .await
            .unwrap();
        assert_eq!(store.writes(), ["countdown"]);
        assert_eq!(updated.status, OrderStatus::Pending);
        assert_eq!(updated.countdown.unwrap().total_duration, 600);
    }

    #[tokio::test]
    async fn conflicting_status_leaves_countdown_untouched() {
        let store = MemoryOrders::new(order(OrderStatus::Processing));
        let live = OrderLiveHub::new();
        let req = countdown_request(Some(OrderStatus::Preparing));

        expect_conflict(
            countdown_with_status(&store, &live, order(OrderStatus::Pending), &req, NOW).await,
        );
        assert!(store.writes().is_empty());
        assert_eq!(store.stored().countdown, None);
    }
}
