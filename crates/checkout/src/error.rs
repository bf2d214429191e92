//! Checkout error types.

use thiserror::Error;

use crate::gateway::GatewayError;
use store::StoreError;

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The submitted cart failed validation.
    #[error(transparent)]
    Cart(#[from] domain::CartError),

    /// The webhook delivery could not be authenticated. Rejected with no
    /// side effects; the gateway's retry policy governs redelivery.
    #[error("webhook signature verification failed: {0}")]
    SignatureInvalid(&'static str),

    /// The webhook payload or its metadata could not be interpreted.
    #[error("malformed webhook event: {0}")]
    MalformedEvent(String),

    /// The payment gateway call failed.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// The store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
