//! The checkout coordinator: intent creation and webhook confirmation.

use common::{CustomerId, Money, SaleId};
use domain::{CartItem, ConfirmedSale};
use metrics::counter;
use store::{ConfirmationOutcome, SalesStore};

use crate::error::{CheckoutError, Result};
use crate::gateway::{IntentCreated, IntentMetadata, IntentRequest, PaymentGateway};
use crate::webhook::{GatewayEvent, PAYMENT_SUCCEEDED, WebhookVerifier};

const DEFAULT_CURRENCY: &str = "usd";

/// Outcome of handling one webhook delivery. All three variants are
/// acknowledged to the gateway with a 2xx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A sale was committed for this delivery.
    Recorded(SaleId),
    /// The payment reference was already in the ledger; replayed delivery.
    Duplicate,
    /// The event type is not one we act on.
    Ignored,
}

/// Coordinates the two halves of checkout against the store and the
/// payment gateway.
pub struct CheckoutCoordinator<S, G> {
    store: S,
    gateway: G,
    verifier: WebhookVerifier,
    currency: String,
}

impl<S, G> CheckoutCoordinator<S, G>
where
    S: SalesStore,
    G: PaymentGateway,
{
    /// Creates a coordinator charging in the default currency.
    pub fn new(store: S, gateway: G, verifier: WebhookVerifier) -> Self {
        Self {
            store,
            gateway,
            verifier,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Overrides the charge currency.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Validates the cart against live stock and opens a payment intent.
    ///
    /// The stock check is advisory: the locks are released once pricing
    /// finishes, and stock is re-validated when the gateway confirms. No
    /// Sale exists until then.
    #[tracing::instrument(skip(self, cart), fields(lines = cart.len()))]
    pub async fn create_payment_intent(
        &self,
        customer_id: CustomerId,
        cart: &[CartItem],
    ) -> Result<(IntentCreated, Money)> {
        domain::validate_cart(cart)?;

        let lines = self.store.lock_and_price(cart).await?;
        let total = domain::cart_total(&lines);

        let created = self
            .gateway
            .create_intent(IntentRequest {
                amount: total,
                currency: self.currency.clone(),
                metadata: IntentMetadata {
                    customer_id,
                    cart: lines,
                },
            })
            .await?;

        counter!("checkout_intents_created_total").increment(1);
        tracing::info!(intent_id = %created.intent_id, amount = total.cents(), "payment intent created");
        Ok((created, total))
    }

    /// Handles one webhook delivery: authenticate, parse, and — for a
    /// succeeded payment — commit the order atomically.
    ///
    /// Deliveries are at-least-once and possibly out of order. Replays
    /// resolve to [`WebhookOutcome::Duplicate`]; a failed commit surfaces
    /// as an error so the gateway redelivers the same event later.
    #[tracing::instrument(skip_all)]
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookOutcome> {
        if let Err(e) = self.verifier.verify(payload, signature_header) {
            counter!("checkout_webhook_rejected_total").increment(1);
            tracing::warn!(error = %e, "rejected webhook delivery");
            return Err(e);
        }

        let event = GatewayEvent::parse(payload)?;
        if event.event_type != PAYMENT_SUCCEEDED {
            tracing::debug!(event_type = %event.event_type, "ignoring gateway event");
            return Ok(WebhookOutcome::Ignored);
        }

        let intent = event.data.object;
        let metadata = IntentMetadata::from_map(&intent.metadata)?;

        let confirmed = ConfirmedSale {
            customer_id: metadata.customer_id,
            payment_ref: intent.id,
            // Trust the gateway-reported amount, not a re-priced cart.
            total: Money::from_cents(intent.amount),
            lines: metadata.cart,
        };

        match self.store.record_confirmed_sale(confirmed).await? {
            ConfirmationOutcome::Recorded(sale_id) => {
                counter!("checkout_sales_recorded_total").increment(1);
                tracing::info!(%sale_id, "sale committed from webhook");
                Ok(WebhookOutcome::Recorded(sale_id))
            }
            ConfirmationOutcome::AlreadyRecorded => {
                tracing::info!("duplicate webhook delivery ignored");
                Ok(WebhookOutcome::Duplicate)
            }
        }
    }

    /// The verifier in use (tests sign forged deliveries with it).
    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }
}
