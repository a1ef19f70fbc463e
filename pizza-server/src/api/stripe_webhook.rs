//! Stripe webhook handler
//!
//! POST /stripe/webhook: raw body, verified against `Stripe-Signature`.
//! The event id and its effects are written in one transaction; a failed
//! delivery rolls back and Stripe's retry is processed from scratch.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use shared::error::{AppError, ErrorCode};
use sqlx::{Postgres, Transaction};

use crate::error::ServiceError;
use crate::state::AppState;
use crate::util::now_millis;
use crate::{db, stripe};

/// Writes a single delivery makes
trait PaymentLedger {
    /// `false` when the event was already processed
    async fn record_event(
        &mut self,
        event_id: &str,
        event_type: &str,
    ) -> Result<bool, sqlx::Error>;
    /// `false` when the order is unknown or already paid
    async fn mark_paid(&mut self, order_id: i64) -> Result<bool, sqlx::Error>;
}

struct PgLedger {
    tx: Transaction<'static, Postgres>,
    now: i64,
}

impl PaymentLedger for PgLedger {
    async fn record_event(
        &mut self,
        event_id: &str,
        event_type: &str,
    ) -> Result<bool, sqlx::Error> {
        db::webhook_events::record(&mut self.tx, event_id, event_type, self.now).await
    }

    async fn mark_paid(&mut self, order_id: i64) -> Result<bool, sqlx::Error> {
        db::orders::mark_paid(&mut self.tx, order_id, self.now).await
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Duplicate,
    Unhandled,
    MissingOrderId,
    /// Completed with a deferred payment method
    AwaitingPayment(i64),
    Paid(i64),
    AlreadyPaid(i64),
}

/// Must receive the raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ServiceError> {
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!(target: "security", event = "webhook_unsigned", "Missing Stripe-Signature header");
        return Err(AppError::with_message(
            ErrorCode::WebhookSignatureInvalid,
            "Missing Stripe-Signature header",
        )
        .into());
    };

    if let Err(e) = stripe::verify_webhook_signature(
        &body,
        sig_header,
        &state.config.stripe_webhook_secret,
        chrono::Utc::now().timestamp(),
    ) {
        tracing::warn!(target: "security", event = "webhook_rejected", error = e, "Webhook signature verification failed");
        return Err(AppError::new(ErrorCode::WebhookSignatureInvalid)
            .with_detail("reason", e)
            .into());
    }

    let event: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(%e, "Failed to parse webhook JSON");
        AppError::validation("Webhook body is not valid JSON")
    })?;

    let event_type = event["type"].as_str().unwrap_or("");
    let Some(event_id) = event["id"].as_str() else {
        tracing::warn!("Webhook event missing id");
        return Err(AppError::validation("Webhook event is missing an id").into());
    };
    tracing::info!(event_id, event_type, "Received Stripe webhook");

    let mut ledger = PgLedger {
        tx: state.pool.begin().await?,
        now: now_millis(),
    };
    // Dropping the transaction on error rolls back the event record too
    let outcome = settle(&mut ledger, event_id, event_type, &event).await?;
    ledger.tx.commit().await?;

    match outcome {
        Outcome::Duplicate => tracing::info!(event_id, "Duplicate webhook event, skipping"),
        Outcome::Unhandled => tracing::debug!(event_type, "Unhandled webhook event type"),
        Outcome::MissingOrderId => {
            tracing::warn!(event_id, "checkout.session.completed missing metadata.order_id")
        }
        Outcome::AwaitingPayment(order_id) => {
            tracing::info!(order_id, "Checkout completed with deferred payment, not marking paid")
        }
        Outcome::Paid(order_id) => tracing::info!(order_id, "Order paid"),
        Outcome::AlreadyPaid(order_id) => {
            tracing::warn!(order_id, "Paid event for unknown or already paid order")
        }
    }
    Ok(StatusCode::OK)
}

/// Record the event and apply it. The caller commits only on `Ok`.
async fn settle<L: PaymentLedger>(
    ledger: &mut L,
    event_id: &str,
    event_type: &str,
    event: &serde_json::Value,
) -> Result<Outcome, sqlx::Error> {
    if !ledger.record_event(event_id, event_type).await? {
        return Ok(Outcome::Duplicate);
    }
    if event_type != "checkout.session.completed" {
        return Ok(Outcome::Unhandled);
    }

    let Some(order_id) = order_id_of(event) else {
        return Ok(Outcome::MissingOrderId);
    };
    if event["data"]["object"]["payment_status"].as_str() == Some("unpaid") {
        return Ok(Outcome::AwaitingPayment(order_id));
    }

    Ok(if ledger.mark_paid(order_id).await? {
        Outcome::Paid(order_id)
    } else {
        Outcome::AlreadyPaid(order_id)
    })
}

/// Order id from `metadata.order_id` of the event object
fn order_id_of(event: &serde_json::Value) -> Option<i64> {
    event["data"]["object"]["metadata"]["order_id"]
        .as_str()
        .and_then(|id| id.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    /// Committed state is the value itself; a delivery works on a clone
    /// that is kept only when it succeeds
    #[derive(Debug, Clone, Default)]
    struct MemoryLedger {
        events: HashSet<String>,
        unpaid: HashSet<i64>,
        paid: HashSet<i64>,
        fail_payment_writes: bool,
    }

    impl PaymentLedger for MemoryLedger {
        async fn record_event(&mut self, event_id: &str, _: &str) -> Result<bool, sqlx::Error> {
            Ok(self.events.insert(event_id.to_string()))
        }

        async fn mark_paid(&mut self, order_id: i64) -> Result<bool, sqlx::Error> {
            if self.fail_payment_writes {
                return Err(sqlx::Error::PoolTimedOut);
            }
            if self.unpaid.remove(&order_id) {
                self.paid.insert(order_id);
                return Ok(true);
            }
            Ok(false)
        }
    }

    fn completed(event_id: &str, order_id: &str, payment_status: &str) -> serde_json::Value {
        json!({
            "id": event_id,
            "type": "checkout.session.completed",
            "data": { "object": {
                "payment_status": payment_status,
                "metadata": { "order_id": order_id }
            } }
        })
    }

    async fn deliver(
        ledger: &MemoryLedger,
        event: &serde_json::Value,
    ) -> (Result<Outcome, sqlx::Error>, MemoryLedger) {
        let mut tx = ledger.clone();
        let id = event["id"].as_str().unwrap();
        let kind = event["type"].as_str().unwrap();
        let outcome = settle(&mut tx, id, kind, event).await;
        (outcome, tx)
    }

    #[test]
    fn order_id_is_read_from_metadata() {
        let event = json!({
            "type": "checkout.session.completed",
            "data": { "object": { "metadata": { "order_id": "12345" } } }
        });
        assert_eq!(order_id_of(&event), Some(12345));
    }

    #[test]
    fn bad_or_missing_order_id_is_none() {
        let event = json!({ "data": { "object": { "metadata": { "order_id": "abc" } } } });
        assert_eq!(order_id_of(&event), None);
        assert_eq!(order_id_of(&json!({ "data": {} })), None);
    }

    #[tokio::test]
    async fn payment_write_failure_is_retried_on_redelivery() {
        let committed = MemoryLedger {
            unpaid: HashSet::from([7]),
            ..Default::default()
        };
        let event = completed("evt_1", "7", "paid");

        let failing = MemoryLedger {
            fail_payment_writes: true,
            ..committed.clone()
        };
        let (outcome, _rolled_back) = deliver(&failing, &event).await;
        assert!(outcome.is_err());

        // The failed delivery was not committed, so the retry pays the order
        let (outcome, committed) = deliver(&committed, &event).await;
        assert_eq!(outcome.unwrap(), Outcome::Paid(7));
        assert!(committed.paid.contains(&7));

        let (outcome, _) = deliver(&committed, &event).await;
        assert_eq!(outcome.unwrap(), Outcome::Duplicate);
    }

    #[tokio::test]
    async fn second_event_for_paid_order_is_harmless() {
        let ledger = MemoryLedger {
            unpaid: HashSet::from([7]),
            ..Default::default()
        };
        let (_, ledger) = deliver(&ledger, &completed("evt_1", "7", "paid")).await;
        let (outcome, _) = deliver(&ledger, &completed("evt_2", "7", "paid")).await;
        assert_eq!(outcome.unwrap(), Outcome::AlreadyPaid(7));
    }

    #[tokio::test]
    async fn deferred_and_foreign_events_do_not_pay() {
        let ledger = MemoryLedger {
            unpaid: HashSet::from([7]),
            ..Default::default()
        };
        let (outcome, after) = deliver(&ledger, &completed("evt_1", "7", "unpaid")).await;
        assert_eq!(outcome.unwrap(), Outcome::AwaitingPayment(7));
        assert!(after.paid.is_empty());

        let refund = json!({ "id": "evt_2", "type": "charge.refunded", "data": {} });
        let (outcome, after) = deliver(&ledger, &refund).await;
        assert_eq!(outcome.unwrap(), Outcome::Unhandled);
        assert!(after.events.contains("evt_2"));

        let (outcome, _) = deliver(&ledger, &completed("evt_3", "abc", "paid")).await;
        assert_eq!(outcome.unwrap(), Outcome::MissingOrderId);
    }
}
