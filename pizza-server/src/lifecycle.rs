//! Order fulfilment lifecycle
//!
//! Status only moves forward along `Pending → Processing → Preparing →
//! Delivering → Completed`. Each status owns a progress band and re-arms the
//! countdown to the minutes left in the remaining phases.

use shared::error::{AppError, ErrorCode};
use shared::models::{Countdown, Order, OrderStatus, PhaseTimes};

/// Default phase estimates in minutes, used while staff have not set them
const DEFAULT_PENDING_MIN: i32 = 0;
const DEFAULT_PROCESSING_MIN: i32 = 5;
const DEFAULT_PREPARATION_MIN: i32 = 15;
const DEFAULT_DELIVERING_MIN: i32 = 15;

/// Progress percentage reached when a status is finished
pub fn progress_target(status: OrderStatus) -> i32 {
    match status {
        OrderStatus::Pending => 20,
        OrderStatus::Processing => 40,
        OrderStatus::Preparing => 70,
        OrderStatus::Delivering | OrderStatus::Completed => 100,
    }
}

/// Progress percentage set on entering a status
pub fn progress_start(status: OrderStatus) -> i32 {
    match status {
        OrderStatus::Pending => 0,
        OrderStatus::Processing => progress_target(OrderStatus::Pending),
        OrderStatus::Preparing => progress_target(OrderStatus::Processing),
        OrderStatus::Delivering => progress_target(OrderStatus::Preparing),
        OrderStatus::Completed => 100,
    }
}

pub fn clamp_progress(progress: i32) -> i32 {
    progress.clamp(0, 100)
}

/// Forward-only; skipping ahead is allowed, `Completed` is final
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), AppError> {
    if from.is_terminal() {
        return Err(AppError::new(ErrorCode::OrderAlreadyCompleted));
    }
    if to <= from {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot move order from {from} to {to}"),
        )
        .with_detail("from", from.as_str())
        .with_detail("to", to.as_str()));
    }
    Ok(())
}

/// Seconds left across the phases still ahead of `status`
pub fn remaining_phase_seconds(status: OrderStatus, times: &PhaseTimes) -> i64 {
    let pending = times.pending_time.unwrap_or(DEFAULT_PENDING_MIN);
    let processing = times.processing_time.unwrap_or(DEFAULT_PROCESSING_MIN);
    let preparation = times.preparation_time.unwrap_or(DEFAULT_PREPARATION_MIN);
    let delivering = times.delivering_time.unwrap_or(DEFAULT_DELIVERING_MIN);

    let minutes = match status {
        OrderStatus::Pending => pending + processing + preparation + delivering,
        OrderStatus::Processing => processing + preparation + delivering,
        OrderStatus::Preparing => preparation + delivering,
        OrderStatus::Delivering => delivering,
        OrderStatus::Completed => 0,
    };
    i64::from(minutes.max(0)) * 60
}

/// Countdown for an order entering `status`.
///
/// An existing `total_duration` is kept so the client's bar keeps its scale.
pub fn rearm_countdown(
    status: OrderStatus,
    times: &PhaseTimes,
    existing: Option<&Countdown>,
    now_ms: i64,
) -> Countdown {
    let current_time = remaining_phase_seconds(status, times);
    Countdown {
        current_time,
        last_updated: now_ms,
        total_duration: existing.map_or(current_time, |c| c.total_duration),
    }
}

/// Countdown started explicitly by staff
pub fn start_countdown(
    total_seconds: i64,
    total_duration: Option<i64>,
    existing: Option<&Countdown>,
    now_ms: i64,
) -> Countdown {
    let current_time = total_seconds.max(0);
    Countdown {
        current_time,
        last_updated: now_ms,
        total_duration: total_duration
            .or(existing.map(|c| c.total_duration))
            .unwrap_or(current_time),
    }
}

/// Planned status write, applied conditionally on `from`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub progress: i32,
    pub countdown: Countdown,
}

pub fn plan_transition(order: &Order, to: OrderStatus, now_ms: i64) -> Result<Transition, AppError> {
    check_transition(order.status, to)?;
    Ok(Transition {
        from: order.status,
        to,
        progress: progress_start(to),
        countdown: rearm_countdown(to, &order.phase_times, order.countdown.as_ref(), now_ms),
    })
}
