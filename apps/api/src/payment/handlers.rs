//! Axum route handlers for the Payment API.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::MaybeAuthUser;
use crate::errors::AppError;
use crate::payment::{find_product, ProductKind, StripeEvent};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub product_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

/// POST /api/v1/payment/create-session
///
/// Creates a Stripe checkout session for one of the fixed products.
pub async fn handle_create_session(
    State(state): State<AppState>,
    MaybeAuthUser(user_id): MaybeAuthUser,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let product = find_product(&request.product_id)
        .ok_or_else(|| AppError::Validation("Invalid product selected".to_string()))?;

    let base_url = &state.config.base_url;
    let session = state
        .payments
        .create_checkout_session(
            product,
            user_id,
            &format!("{base_url}/payment/success?session_id={{CHECKOUT_SESSION_ID}}"),
            &format!("{base_url}/payment/cancel"),
        )
        .await?;

    Ok(Json(CreateSessionResponse {
        url: session.url.unwrap_or_default(),
        session_id: session.id,
    }))
}

/// POST /api/v1/payment/webhook
///
/// Receives signed Stripe events. The signature is validated against the raw
/// body before the payload is trusted; invalid signatures get a 400.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Webhook("No signature provided".to_string()))?;

    let event = state.payments.verify_webhook(&body, signature)?;

    match event.event_type.as_str() {
        "checkout.session.completed" => handle_checkout_completed(&state, &event).await?,
        "customer.subscription.deleted" => handle_subscription_deleted(&state, &event).await?,
        "payment_intent.payment_failed" => {
            let intent_id = event.data.object["id"].as_str().unwrap_or("unknown");
            warn!("Payment failed for intent {intent_id}");
        }
        other => {
            info!("Ignoring webhook event type {other}");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// Grants the entitlement purchased in a completed checkout session: the
/// monthly plan activates the subscription, the single purchase adds a credit.
async fn handle_checkout_completed(state: &AppState, event: &StripeEvent) -> Result<(), AppError> {
    let object = &event.data.object;

    let user_id = object["client_reference_id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| {
            AppError::Webhook("checkout session missing client_reference_id".to_string())
        })?;

    let customer_id = object["customer"].as_str();
    let kind = match object["mode"].as_str() {
        Some("subscription") => ProductKind::Subscription,
        _ => ProductKind::OneTime,
    };

    match kind {
        ProductKind::Subscription => {
            sqlx::query(
                r#"
                INSERT INTO subscriptions (id, user_id, status, plan, credits_remaining, stripe_customer_id)
                VALUES ($1, $2, 'active', 'subscription', 0, $3)
                ON CONFLICT (user_id) DO UPDATE
                SET status = 'active', plan = 'subscription',
                    stripe_customer_id = EXCLUDED.stripe_customer_id,
                    updated_at = now()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(customer_id)
            .execute(&state.db)
            .await?;
        }
        ProductKind::OneTime => {
            sqlx::query(
                r#"
                INSERT INTO subscriptions (id, user_id, status, plan, credits_remaining, stripe_customer_id)
                VALUES ($1, $2, 'active', 'one-time', 1, $3)
                ON CONFLICT (user_id) DO UPDATE
                SET status = 'active',
                    credits_remaining = subscriptions.credits_remaining + 1,
                    stripe_customer_id = COALESCE(EXCLUDED.stripe_customer_id, subscriptions.stripe_customer_id),
                    updated_at = now()
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(customer_id)
            .execute(&state.db)
            .await?;
        }
    }

    info!("Entitlement granted to user {user_id} ({kind:?})");
    Ok(())
}

/// Revokes the entitlement when a subscription is cancelled.
async fn handle_subscription_deleted(state: &AppState, event: &StripeEvent) -> Result<(), AppError> {
    let customer_id = event.data.object["customer"].as_str().ok_or_else(|| {
        AppError::Webhook("subscription event missing customer".to_string())
    })?;

    let updated = sqlx::query(
        "UPDATE subscriptions SET status = 'canceled', updated_at = now() WHERE stripe_customer_id = $1",
    )
    .bind(customer_id)
    .execute(&state.db)
    .await?;

    if updated.rows_affected() == 0 {
        warn!("Subscription deleted for unknown customer {customer_id}");
    } else {
        info!("Subscription cancelled for customer {customer_id}");
    }

    Ok(())
}
