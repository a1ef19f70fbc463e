//! OrderLiveHub: per-order broadcast rooms
//!
//! ```text
//! order handlers / StartCountdown
//!       │ LiveMessage
//!       ▼
//! OrderLiveHub
//!   └── rooms: order_id → broadcast::Sender<LiveMessage>
//!         │
//!         ▼
//!   live WS handlers (one receiver per socket)
//! ```
//!
//! Rooms are created on first subscribe and dropped once the last
//! subscriber has released them. Publishing to an order nobody watches is a
//! no-op.

use dashmap::DashMap;
use shared::live::LiveMessage;
use shared::models::{Countdown, Order};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast channel capacity per order
const ROOM_CAPACITY: usize = 64;

#[derive(Clone, Default)]
pub struct OrderLiveHub {
    rooms: Arc<DashMap<i64, broadcast::Sender<LiveMessage>>>,
}

impl OrderLiveHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, order_id: i64) -> broadcast::Receiver<LiveMessage> {
        self.rooms
            .entry(order_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .downgrade()
            .subscribe()
    }

    /// Send to everyone watching `order_id`; returns the number of receivers
    pub fn publish(&self, order_id: i64, message: LiveMessage) -> usize {
        match self.rooms.get(&order_id) {
            // send fails only when there are no receivers
            Some(room) => room.send(message).unwrap_or(0),
            None => 0,
        }
    }

    /// Drop the room if no receiver is left. Call after dropping a receiver.
    pub fn release(&self, order_id: i64) {
        self.rooms
            .remove_if(&order_id, |_, tx| tx.receiver_count() == 0);
    }

    pub fn watchers(&self, order_id: i64) -> usize {
        self.rooms
            .get(&order_id)
            .map_or(0, |room| room.receiver_count())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Snapshot sent on connect and after a subscriber lagged
pub fn ready_message(order: &Order, now_ms: i64) -> LiveMessage {
    LiveMessage::Ready {
        order_id: order.id,
        status: order.status,
        remaining_time: order.remaining_time(now_ms),
        progress: order.progress_bar.current_progress,
    }
}

pub fn countdown_message(countdown: &Countdown, now_ms: i64) -> LiveMessage {
    LiveMessage::CountdownUpdate {
        remaining_time: countdown.remaining_at(now_ms),
        start_time: countdown.last_updated,
    }
}
