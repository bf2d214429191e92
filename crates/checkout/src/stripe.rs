//! Stripe-compatible HTTP payment gateway client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::gateway::{GatewayError, IntentCreated, IntentRequest, PaymentGateway};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Payment gateway backed by the Stripe HTTP API.
///
/// Only the intent-creation call is needed here; confirmation arrives
/// through the webhook, not through this client.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeGateway {
    /// Creates a gateway client authenticated with the given secret key.
    pub fn new(secret_key: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: secret_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Overrides the API base URL (for tests against a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn intent_form(request: &IntentRequest) -> Result<Vec<(String, String)>, GatewayError> {
        let metadata = request
            .metadata
            .to_map()
            .map_err(|e| GatewayError::InvalidResponse(format!("unencodable metadata: {e}")))?;

        let mut form = vec![
            ("amount".to_string(), request.amount.cents().to_string()),
            ("currency".to_string(), request.currency.clone()),
            ("payment_method_types[]".to_string(), "card".to_string()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{key}]"), value));
        }
        Ok(form)
    }
}

#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    client_secret: String,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<IntentCreated, GatewayError> {
        let form = Self::intent_form(&request)?;

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            // Server faults are worth retrying; client faults are not.
            if status.is_server_error() {
                return Err(GatewayError::Unreachable(format!(
                    "gateway returned {status}: {message}"
                )));
            }
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: StripeIntentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        Ok(IntentCreated {
            intent_id: body.id,
            client_secret: body.client_secret,
        })
    }
}
