//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::menu_item::ExtraPrice;

/// Fulfilment status, a fixed linear progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Preparing,
    Delivering,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Preparing,
        OrderStatus::Delivering,
        OrderStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Preparing => "Preparing",
            Self::Delivering => "Delivering",
            Self::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// Completion percentage shown to the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressBar {
    /// 0..=100
    pub current_progress: i32,
    pub last_updated: i64,
}

/// Remaining-time snapshot. Clients recompute the live value on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    /// Remaining seconds at `last_updated`
    pub current_time: i64,
    /// Unix millis
    pub last_updated: i64,
    /// Seconds the whole countdown spans
    pub total_duration: i64,
}

impl Countdown {
    /// Seconds left at `now_ms`, never negative
    pub fn remaining_at(&self, now_ms: i64) -> i64 {
        let elapsed = (now_ms - self.last_updated).max(0) / 1000;
        (self.current_time - elapsed).max(0)
    }
}

/// Per-phase duration estimates in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhaseTimes {
    pub pending_time: Option<i32>,
    pub processing_time: Option<i32>,
    pub preparation_time: Option<i32>,
    pub delivering_time: Option<i32>,
    pub total_delivery_time: Option<i32>,
    pub estimated_delivery_time: Option<i32>,
}

/// Delivery address captured at checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
}

/// Priced cart line, frozen into the order at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub menu_item_id: i64,
    pub name: String,
    pub size: Option<ExtraPrice>,
    #[serde(default)]
    pub extras: Vec<ExtraPrice>,
    pub quantity: u32,
    /// Price of one unit including size and extras
    pub unit_price: Decimal,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub branch_id: i64,
    pub user_email: String,
    #[serde(flatten)]
    pub address: DeliveryAddress,
    pub cart_products: Vec<CartLine>,
    pub paid: bool,
    pub status: OrderStatus,
    pub total_price: Decimal,
    pub progress_bar: ProgressBar,
    #[serde(flatten)]
    pub phase_times: PhaseTimes,
    pub delivery_distance: String,
    pub countdown: Option<Countdown>,
    pub stripe_session_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// Seconds left for the customer; 0 once completed or without a countdown
    pub fn remaining_time(&self, now_ms: i64) -> i64 {
        match self.countdown {
            Some(countdown) if !self.status.is_terminal() => countdown.remaining_at(now_ms),
            _ => 0,
        }
    }

    pub fn into_view(self, now_ms: i64) -> OrderView {
        OrderView {
            remaining_time: self.remaining_time(now_ms),
            order: self,
        }
    }
}

/// Order as returned by the API, with the countdown evaluated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub remaining_time: i64,
}

/// POST /api/orders/{id}/status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// POST /api/orders/{id}/progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress: i32,
}

/// POST /api/orders/{id}/countdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownStart {
    pub total_seconds: i64,
    pub total_duration: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// POST /api/orders/{id}/delivery-time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTimeUpdate {
    pub total_delivery_time: i32,
    pub preparation_time: Option<i32>,
    pub delivering_time: Option<i32>,
    pub pending_time: Option<i32>,
    pub processing_time: Option<i32>,
}

/// Cart line as sent by the client; prices are resolved server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemRequest {
    pub menu_item_id: i64,
    pub size_id: Option<i64>,
    #[serde(default)]
    pub extra_ids: Vec<i64>,
    /// Defaults to 1
    pub quantity: Option<u32>,
}

/// POST /api/checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCreate {
    pub branch_id: i64,
    #[serde(default)]
    pub cart_products: Vec<CartItemRequest>,
    #[serde(default)]
    pub address: DeliveryAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, countdown: Option<Countdown>) -> Order {
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
            countdown,
            stripe_session_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn status_serializes_as_plain_name() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Preparing).unwrap(),
            "\"Preparing\""
        );
        assert_eq!("Delivering".parse::<OrderStatus>(), Ok(OrderStatus::Delivering));
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn statuses_are_ordered() {
        assert!(OrderStatus::Pending < OrderStatus::Processing);
        assert!(OrderStatus::Delivering < OrderStatus::Completed);
        assert!(OrderStatus::Completed.is_terminal());
    }

    #[test]
    fn countdown_subtracts_whole_elapsed_seconds() {
        let c = Countdown { current_time: 600, last_updated: 1_000_000, total_duration: 900 };
        assert_eq!(c.remaining_at(1_000_000), 600);
        assert_eq!(c.remaining_at(1_001_999), 599);
        assert_eq!(c.remaining_at(1_060_000), 540);
        assert_eq!(c.remaining_at(2_000_000), 0);
    }

    #[test]
    fn countdown_ignores_clock_going_backwards() {
        let c = Countdown { current_time: 60, last_updated: 5_000, total_duration: 60 };
        assert_eq!(c.remaining_at(1_000), 60);
    }

    #[test]
    fn remaining_time_is_zero_when_completed_or_unset() {
        let c = Countdown { current_time: 600, last_updated: 0, total_duration: 600 };
        assert_eq!(order(OrderStatus::Completed, Some(c)).remaining_time(0), 0);
        assert_eq!(order(OrderStatus::Preparing, None).remaining_time(0), 0);
        assert_eq!(order(OrderStatus::Preparing, Some(c)).remaining_time(10_000), 590);
    }

    #[test]
    fn view_flattens_order_fields() {
        let view = order(OrderStatus::Pending, None).into_view(0);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["remaining_time"], 0);
        assert_eq!(json["street_address"], "");
    }
}
