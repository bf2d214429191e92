//! Transient cart types used during checkout.
//!
//! A cart is never persisted; it exists only for the duration of a checkout
//! request. The priced form ([`PricedLine`]) snapshots the product name and
//! unit price so the webhook confirmation can use purchase-time values
//! instead of whatever the live catalog says by then.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single cart entry as submitted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Errors raised by cart validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("cart is empty")]
    Empty,

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: u32,
    },
}

/// Validates the shape of a submitted cart: non-empty, every quantity ≥ 1.
pub fn validate_cart(items: &[CartItem]) -> Result<(), CartError> {
    if items.is_empty() {
        return Err(CartError::Empty);
    }
    for item in items {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }
    }
    Ok(())
}

/// A cart line priced against the catalog at intent-creation time.
///
/// Serialized verbatim into the payment intent's metadata and read back at
/// webhook confirmation, so the field set is the wire format of the cart
/// snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl PricedLine {
    /// Returns quantity × unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Sums the line totals of a priced cart.
pub fn cart_total(lines: &[PricedLine]) -> Money {
    lines.iter().map(PricedLine::line_total).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(cents: i64, quantity: u32) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(),
            name: "Widget".to_string(),
            quantity,
            unit_price: Money::from_cents(cents),
        }
    }

    #[test]
    fn empty_cart_rejected() {
        assert_eq!(validate_cart(&[]), Err(CartError::Empty));
    }

    #[test]
    fn zero_quantity_rejected() {
        let product_id = ProductId::new();
        let items = [CartItem {
            product_id,
            quantity: 0,
        }];
        assert_eq!(
            validate_cart(&items),
            Err(CartError::InvalidQuantity {
                product_id,
                quantity: 0
            })
        );
    }

    #[test]
    fn valid_cart_accepted() {
        let items = [
            CartItem {
                product_id: ProductId::new(),
                quantity: 2,
            },
            CartItem {
                product_id: ProductId::new(),
                quantity: 1,
            },
        ];
        assert!(validate_cart(&items).is_ok());
    }

    #[test]
    fn cart_total_sums_line_totals() {
        // 2 × 50.00 + 1 × 30.00 = 130.00
        let lines = [line(5000, 2), line(3000, 1)];
        assert_eq!(cart_total(&lines).cents(), 13000);
    }

    #[test]
    fn priced_line_snapshot_roundtrip() {
        let original = line(999, 3);
        let json = serde_json::to_string(&original).unwrap();
        let back: PricedLine = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }
}
