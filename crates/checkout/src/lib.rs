//! Checkout coordination for the storefront system.
//!
//! The flow has two halves that never share a lock:
//! 1. [`CheckoutCoordinator::create_payment_intent`] prices the cart against
//!    live stock (advisory check) and opens an intent with the external
//!    payment gateway, embedding a cart snapshot in the intent metadata.
//! 2. The gateway later confirms asynchronously via webhook;
//!    [`CheckoutCoordinator::handle_webhook`] verifies the delivery,
//!    re-validates stock and commits the whole order atomically. Deliveries
//!    are at-least-once and possibly out of order, so the commit is
//!    idempotent on the payment reference.

pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod stripe;
pub mod webhook;

pub use coordinator::{CheckoutCoordinator, WebhookOutcome};
pub use error::{CheckoutError, Result};
pub use gateway::{
    GatewayError, InMemoryGateway, IntentCreated, IntentMetadata, IntentRequest, PaymentGateway,
};
pub use stripe::StripeGateway;
pub use webhook::{GatewayEvent, PAYMENT_SUCCEEDED, SIGNATURE_HEADER, WebhookVerifier};
