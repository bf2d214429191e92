//! Checkout endpoints: payment intent creation and the gateway webhook.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use checkout::{CheckoutError, PaymentGateway, SIGNATURE_HEADER, WebhookOutcome};
use common::CustomerId;
use domain::CartItem;
use serde::{Deserialize, Serialize};
use store::SalesStore;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CheckoutIntentRequest {
    pub customer_id: CustomerId,
    pub cart: Vec<CartItem>,
}

#[derive(Serialize)]
pub struct CheckoutIntentResponse {
    pub intent_id: String,
    pub client_secret: String,
    pub amount_cents: i64,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,
}

/// POST /checkout/intent — validate the cart against live stock and open a
/// payment intent with the gateway.
#[tracing::instrument(skip(state, req))]
pub async fn create_intent<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<CheckoutIntentRequest>,
) -> Result<Json<CheckoutIntentResponse>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let (created, total) = state
        .coordinator
        .create_payment_intent(req.customer_id, &req.cart)
        .await?;

    Ok(Json(CheckoutIntentResponse {
        intent_id: created.intent_id,
        client_secret: created.client_secret,
        amount_cents: total.cents(),
    }))
}

/// POST /checkout/webhook — handle one gateway delivery.
///
/// Replays and unrelated event types are acknowledged with 200 so the
/// gateway stops retrying; authentication and payload problems get a 400
/// (no retry will fix them); a failed confirmation transaction gets a 500
/// so the gateway redelivers the event later.
#[tracing::instrument(skip_all)]
pub async fn webhook<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("missing stripe-signature header".to_string()))?;

    match state.coordinator.handle_webhook(&body, signature).await {
        Ok(outcome) => {
            let (label, sale_id) = match outcome {
                WebhookOutcome::Recorded(sale_id) => ("recorded", Some(sale_id.to_string())),
                WebhookOutcome::Duplicate => ("duplicate", None),
                WebhookOutcome::Ignored => ("ignored", None),
            };
            Ok(Json(WebhookAck {
                received: true,
                outcome: label,
                sale_id,
            }))
        }
        Err(err @ (CheckoutError::SignatureInvalid(_) | CheckoutError::MalformedEvent(_))) => {
            Err(ApiError::BadRequest(err.to_string()))
        }
        // Anything that failed the confirmation transaction must come back
        // as a server fault so the gateway's retry policy redelivers it.
        Err(err) => Err(ApiError::Internal(format!(
            "confirmation failed, awaiting redelivery: {err}"
        ))),
    }
}
