//! Stripe integration via REST API (no SDK dependency)

use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sha2::Sha256;
use shared::models::CartLine;

use crate::error::BoxError;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Signed events older than this are rejected
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Everything needed to open a one-off payment session for an order
pub struct CheckoutRequest<'a> {
    pub order_id: i64,
    pub customer_email: &'a str,
    pub lines: &'a [CartLine],
    pub currency: &'a str,
    pub delivery_fee_cents: i64,
    pub success_url: String,
    pub cancel_url: String,
}

/// Hosted checkout session as returned by Stripe
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(http: reqwest::Client, secret_key: String) -> Self {
        Self { http, secret_key }
    }

    /// Create a Checkout Session (payment mode)
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, BoxError> {
        let form = checkout_form(request);
        let resp: serde_json::Value = self
            .http
            .post(CHECKOUT_SESSIONS_URL)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?
            .json()
            .await?;

        match (resp["id"].as_str(), resp["url"].as_str()) {
            (Some(id), Some(url)) => Ok(CheckoutSession {
                id: id.to_string(),
                url: url.to_string(),
            }),
            _ => Err(format!("Stripe create_checkout failed: {}", resp["error"]).into()),
        }
    }
}

/// Price in minor units, rounded half away from zero
pub fn to_cents(amount: Decimal) -> i64 {
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

fn line_label(line: &CartLine) -> String {
    match &line.size {
        Some(size) => format!("{} ({})", line.name, size.name),
        None => line.name.clone(),
    }
}

/// Form body for `POST /v1/checkout/sessions`
pub fn checkout_form(request: &CheckoutRequest<'_>) -> Vec<(String, String)> {
    let order_id = request.order_id.to_string();
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("customer_email".into(), request.customer_email.into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
        ("metadata[order_id]".into(), order_id.clone()),
        ("payment_intent_data[metadata][order_id]".into(), order_id),
    ];

    for (i, line) in request.lines.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((format!("{prefix}[quantity]"), line.quantity.to_string()));
        form.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.to_lowercase(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            to_cents(line.unit_price).to_string(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            line_label(line),
        ));
    }

    let rate = "shipping_options[0][shipping_rate_data]";
    form.push((format!("{rate}[display_name]"), "Delivery fee".into()));
    form.push((format!("{rate}[type]"), "fixed_amount".into()));
    form.push((
        format!("{rate}[fixed_amount][amount]"),
        request.delivery_fee_cents.to_string(),
    ));
    form.push((
        format!("{rate}[fixed_amount][currency]"),
        request.currency.to_lowercase(),
    ));

    form
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now_secs: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now_secs - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err("Webhook timestamp too old");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Any v1 entry may match during secret rotation
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err("Webhook signature mismatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ExtraPrice;

    fn sign(payload: &[u8], secret: &str, ts: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{ts}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn line(name: &str, size: Option<&str>, qty: u32, price: &str) -> CartLine {
        CartLine {
            menu_item_id: 1,
            name: name.into(),
            size: size.map(|s| ExtraPrice {
                id: 1,
                name: s.into(),
                price: Decimal::ZERO,
            }),
            extras: vec![],
            quantity: qty,
            unit_price: price.parse().unwrap(),
        }
    }

    fn value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn cents_are_rounded() {
        assert_eq!(to_cents("12.345".parse().unwrap()), 1235);
        assert_eq!(to_cents("9.99".parse().unwrap()), 999);
        assert_eq!(to_cents(Decimal::ZERO), 0);
    }

    #[test]
    fn checkout_form_lists_every_line() {
        let lines = vec![
            line("Margherita", Some("Large"), 2, "15.50"),
            line("Cola", None, 1, "2"),
        ];
        let form = checkout_form(&CheckoutRequest {
            order_id: 42,
            customer_email: "a@example.com",
            lines: &lines,
            currency: "PHP",
            delivery_fee_cents: 2000,
            success_url: "http://shop/orders/42?clear-cart=1".into(),
            cancel_url: "http://shop/cart?canceled=1".into(),
        });

        assert_eq!(value(&form, "mode"), Some("payment"));
        assert_eq!(value(&form, "metadata[order_id]"), Some("42"));
        assert_eq!(
            value(&form, "payment_intent_data[metadata][order_id]"),
            Some("42")
        );
        assert_eq!(
            value(&form, "line_items[0][price_data][product_data][name]"),
            Some("Margherita (Large)")
        );
        assert_eq!(value(&form, "line_items[0][quantity]"), Some("2"));
        assert_eq!(
            value(&form, "line_items[0][price_data][unit_amount]"),
            Some("1550")
        );
        assert_eq!(
            value(&form, "line_items[1][price_data][currency]"),
            Some("php")
        );
        assert_eq!(
            value(
                &form,
                "shipping_options[0][shipping_rate_data][fixed_amount][amount]"
            ),
            Some("2000")
        );
    }

    #[test]
    fn valid_signature_is_accepted() {
        let payload = br#"{"id":"evt_1"}"#;
        let sig = sign(payload, "whsec_test", 1_700_000_000);
        let header = format!("t=1700000000,v1={sig}");
        assert!(verify_webhook_signature(payload, &header, "whsec_test", 1_700_000_010).is_ok());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let sig = sign(b"original", "whsec_test", 1_700_000_000);
        let header = format!("t=1700000000,v1={sig}");
        assert_eq!(
            verify_webhook_signature(b"tampered", &header, "whsec_test", 1_700_000_000),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn stale_signature_is_rejected() {
        let payload = b"{}";
        let sig = sign(payload, "whsec_test", 1_700_000_000);
        let header = format!("t=1700000000,v1={sig}");
        assert_eq!(
            verify_webhook_signature(payload, &header, "whsec_test", 1_700_000_301),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert_eq!(
            verify_webhook_signature(b"{}", "v0=abc", "whsec_test", 0),
            Err("Invalid Stripe-Signature header")
        );
    }
}
