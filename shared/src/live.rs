//! Live order channel protocol
//!
//! Server → Client: [`LiveMessage`]
//! Client → Server: [`LiveCommand`]
//!
//! One channel per order. Messages are JSON with a `type` tag.

use serde::{Deserialize, Serialize};

use crate::models::order::OrderStatus;

/// Server → Client push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LiveMessage {
    /// Sent on connect and whenever the client fell behind
    Ready {
        order_id: i64,
        status: OrderStatus,
        remaining_time: i64,
        progress: i32,
    },

    /// Countdown (re)started. `start_time` is Unix millis.
    CountdownUpdate { remaining_time: i64, start_time: i64 },

    StatusChanged { status: OrderStatus, progress: i32 },

    ProgressUpdated { progress: i32 },
}

/// Client → Server command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LiveCommand {
    /// Start the countdown at `total_time` seconds (order managers only)
    StartCountdown { total_time: i64 },
}
