//! Payment — Stripe checkout-session creation and webhook verification.
//!
//! ARCHITECTURAL RULE: no other module talks to the Stripe API directly.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;

pub mod handlers;

const STRIPE_API_URL: &str = "https://api.stripe.com/v1";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("malformed webhook payload: {0}")]
    Payload(String),
}

impl From<PaymentError> for AppError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::InvalidSignature | PaymentError::Payload(_) => {
                AppError::Webhook(e.to_string())
            }
            other => AppError::Internal(anyhow::anyhow!("payment provider error: {other}")),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Product catalog
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductKind {
    OneTime,
    Subscription,
}

/// A purchasable product. `price` is in minor units (cents).
#[derive(Debug, Clone, Serialize)]
pub struct PaymentProduct {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub price: u32,
    pub currency: &'static str,
    pub kind: ProductKind,
}

/// The two fixed products: a single optimization and the unlimited plan.
pub const PRODUCTS: [PaymentProduct; 2] = [
    PaymentProduct {
        id: "resume-optimization-single",
        name: "Resume Optimization",
        description: "One-time resume optimization with ATS analysis",
        price: 1999,
        currency: "usd",
        kind: ProductKind::OneTime,
    },
    PaymentProduct {
        id: "resume-optimization-unlimited",
        name: "Unlimited Resume Optimization",
        description: "Monthly subscription for unlimited resume optimizations",
        price: 999,
        currency: "usd",
        kind: ProductKind::Subscription,
    },
];

pub fn find_product(id: &str) -> Option<&'static PaymentProduct> {
    PRODUCTS.iter().find(|p| p.id == id)
}

// ────────────────────────────────────────────────────────────────────────────
// Checkout sessions
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// A signed event delivered to the webhook endpoint.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: String,
}

/// Thin Stripe client: form-encoded REST calls plus webhook verification.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(secret_key: String, webhook_secret: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            secret_key,
            webhook_secret,
        }
    }

    /// Creates a checkout session for one product. `client_reference_id`
    /// carries the purchasing user's id so the completion webhook can be
    /// attributed.
    pub async fn create_checkout_session(
        &self,
        product: &PaymentProduct,
        client_reference_id: Option<Uuid>,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut form: Vec<(&str, String)> = vec![
            ("payment_method_types[0]", "card".to_string()),
            (
                "line_items[0][price_data][currency]",
                product.currency.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                product.name.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                product.description.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                product.price.to_string(),
            ),
            ("line_items[0][quantity]", "1".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
        ];

        match product.kind {
            ProductKind::Subscription => {
                form.push((
                    "line_items[0][price_data][recurring][interval]",
                    "month".to_string(),
                ));
                form.push(("mode", "subscription".to_string()));
            }
            ProductKind::OneTime => form.push(("mode", "payment".to_string())),
        }

        if let Some(user_id) = client_reference_id {
            form.push(("client_reference_id", user_id.to_string()));
        }

        let response = self
            .client
            .post(format!("{STRIPE_API_URL}/checkout/sessions"))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Verifies the `Stripe-Signature` header against the raw body, then
    /// parses the event. Untrusted payloads are rejected before parsing.
    pub fn verify_webhook(
        &self,
        body: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, PaymentError> {
        if !verify_signature(body, signature_header, &self.webhook_secret) {
            return Err(PaymentError::InvalidSignature);
        }

        serde_json::from_slice(body).map_err(|e| PaymentError::Payload(e.to_string()))
    }
}

/// Stripe signs `"{t}.{body}"` with HMAC-SHA256; the header carries
/// `t=<timestamp>,v1=<hex>[,v1=<hex>...]`. Any matching v1 accepts.
/// Comparison goes through `Mac::verify_slice` for constant-time equality.
fn verify_signature(body: &[u8], signature_header: &str, secret: &str) -> bool {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }

    let (Some(timestamp), false) = (timestamp, candidates.is_empty()) else {
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);

    candidates.iter().any(|c| {
        hex::decode(c)
            .is_ok_and(|sig| mac.clone().verify_slice(&sig).is_ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn sign(body: &[u8], timestamp: &str, secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_find_product() {
        assert!(find_product("resume-optimization-single").is_some());
        assert!(find_product("resume-optimization-unlimited").is_some());
        assert!(find_product("nonexistent").is_none());
    }

    #[test]
    fn test_product_catalog_prices() {
        let single = find_product("resume-optimization-single").unwrap();
        assert_eq!(single.price, 1999);
        assert_eq!(single.kind, ProductKind::OneTime);

        let unlimited = find_product("resume-optimization-unlimited").unwrap();
        assert_eq!(unlimited.price, 999);
        assert_eq!(unlimited.kind, ProductKind::Subscription);
    }

    #[test]
    fn test_valid_signature_accepts() {
        let body = br#"{"type":"checkout.session.completed","data":{"object":{}}}"#;
        let sig = sign(body, "1700000000", SECRET);
        let header = format!("t=1700000000,v1={sig}");
        assert!(verify_signature(body, &header, SECRET));
    }

    #[test]
    fn test_tampered_body_rejects() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let sig = sign(body, "1700000000", SECRET);
        let header = format!("t=1700000000,v1={sig}");
        assert!(!verify_signature(b"{\"type\":\"other\"}", &header, SECRET));
    }

    #[test]
    fn test_wrong_secret_rejects() {
        let body = b"payload";
        let sig = sign(body, "1700000000", "whsec_other");
        let header = format!("t=1700000000,v1={sig}");
        assert!(!verify_signature(body, &header, SECRET));
    }

    #[test]
    fn test_missing_components_reject() {
        assert!(!verify_signature(b"payload", "", SECRET));
        assert!(!verify_signature(b"payload", "t=1700000000", SECRET));
        assert!(!verify_signature(b"payload", "v1=abc", SECRET));
    }

    #[test]
    fn test_uppercase_hex_signature_accepts() {
        // Hex case must not matter; the compare works on decoded bytes
        let body = b"payload";
        let sig = sign(body, "1700000000", SECRET).to_uppercase();
        let header = format!("t=1700000000,v1={sig}");
        assert!(verify_signature(body, &header, SECRET));
    }

    #[test]
    fn test_non_hex_signature_rejects() {
        let body = b"payload";
        let header = "t=1700000000,v1=zzzz-not-hex";
        assert!(!verify_signature(body, header, SECRET));
    }

    #[test]
    fn test_any_matching_v1_accepts() {
        // During secret rotation Stripe sends multiple v1 entries
        let body = b"payload";
        let sig = sign(body, "1700000000", SECRET);
        let header = format!("t=1700000000,v1=deadbeef,v1={sig}");
        assert!(verify_signature(body, &header, SECRET));
    }

    #[test]
    fn test_verify_webhook_parses_event() {
        let client = StripeClient::new("sk_test".to_string(), SECRET.to_string());
        let body = br#"{"type":"customer.subscription.deleted","data":{"object":{"id":"sub_1"}}}"#;
        let sig = sign(body, "1700000000", SECRET);
        let header = format!("t=1700000000,v1={sig}");

        let event = client.verify_webhook(body, &header).unwrap();
        assert_eq!(event.event_type, "customer.subscription.deleted");
        assert_eq!(event.data.object["id"], "sub_1");
    }

    #[test]
    fn test_verify_webhook_rejects_bad_signature() {
        let client = StripeClient::new("sk_test".to_string(), SECRET.to_string());
        let err = client
            .verify_webhook(b"{}", "t=1,v1=bogus")
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature));
    }
}
