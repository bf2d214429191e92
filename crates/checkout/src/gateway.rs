//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, Money};
use domain::PricedLine;
use thiserror::Error;

use crate::error::CheckoutError;

/// Errors from the payment gateway client.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached or answered with a server fault.
    /// Transient: the caller may retry.
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway rejected the request.
    #[error("payment gateway rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The gateway answered with a body that could not be interpreted.
    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// The opaque metadata attached to a payment intent: the customer and the
/// cart snapshot, carried as flat string key/values the way gateways store
/// metadata. The webhook handler reads the snapshot back instead of
/// trusting live catalog data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentMetadata {
    pub customer_id: CustomerId,
    pub cart: Vec<PricedLine>,
}

impl IntentMetadata {
    pub const CUSTOMER_KEY: &'static str = "customer_id";
    pub const CART_KEY: &'static str = "cart";

    /// Flattens into gateway metadata key/values; the cart travels as a
    /// JSON string.
    pub fn to_map(&self) -> Result<HashMap<String, String>, serde_json::Error> {
        let mut map = HashMap::new();
        map.insert(
            Self::CUSTOMER_KEY.to_string(),
            self.customer_id.to_string(),
        );
        map.insert(Self::CART_KEY.to_string(), serde_json::to_string(&self.cart)?);
        Ok(map)
    }

    /// Reads the metadata back out of a webhook event's key/values.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, CheckoutError> {
        let customer_id = map
            .get(Self::CUSTOMER_KEY)
            .ok_or_else(|| CheckoutError::MalformedEvent("missing customer_id metadata".into()))?
            .parse::<CustomerId>()
            .map_err(|e| CheckoutError::MalformedEvent(format!("invalid customer_id: {e}")))?;

        let cart = map
            .get(Self::CART_KEY)
            .ok_or_else(|| CheckoutError::MalformedEvent("missing cart metadata".into()))?;
        let cart: Vec<PricedLine> = serde_json::from_str(cart)
            .map_err(|e| CheckoutError::MalformedEvent(format!("invalid cart snapshot: {e}")))?;

        Ok(Self { customer_id, cart })
    }
}

/// Request to open a payment intent.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    /// Amount in minor currency units.
    pub amount: Money,
    pub currency: String,
    pub metadata: IntentMetadata,
}

/// A successfully opened payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentCreated {
    /// Gateway-assigned intent id; becomes the sale's payment reference.
    pub intent_id: String,
    /// Secret the frontend uses to complete the payment.
    pub client_secret: String,
}

/// Trait for payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a payment intent for the given amount and metadata.
    async fn create_intent(&self, request: IntentRequest) -> Result<IntentCreated, GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    intents: HashMap<String, IntentRequest>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of intents opened so far.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }

    /// Returns the stored request for an intent id.
    pub fn get_intent(&self, intent_id: &str) -> Option<IntentRequest> {
        self.state.read().unwrap().intents.get(intent_id).cloned()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_intent(&self, request: IntentRequest) -> Result<IntentCreated, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError::Unreachable(
                "connection refused (simulated)".to_string(),
            ));
        }

        state.next_id += 1;
        let intent_id = format!("pi_{:04}", state.next_id);
        let client_secret = format!("{intent_id}_secret_{:04}", state.next_id);
        state.intents.insert(intent_id.clone(), request);

        Ok(IntentCreated {
            intent_id,
            client_secret,
        })
    }
}
