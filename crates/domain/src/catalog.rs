//! Catalog types: products and warranty templates.

use common::{Money, ProductId, WarrantyTemplateId};
use serde::{Deserialize, Serialize};

/// A product in the catalog.
///
/// `stock` is the live on-hand quantity; it only ever changes under an
/// exclusive row lock held by the store, so it can never go negative in a
/// committed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in cents. Captured into sale details at purchase time;
    /// changing it later never rewrites history.
    pub price: Money,
    pub stock: u32,
    /// Warranty template activated for each unit sold, if any.
    pub warranty_template: Option<WarrantyTemplateId>,
}

impl Product {
    /// Returns true if the requested quantity can be satisfied.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub warranty_template: Option<WarrantyTemplateId>,
}

/// A reusable warranty policy, instantiated into an [`super::ActivatedWarranty`]
/// at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyTemplate {
    pub id: WarrantyTemplateId,
    pub title: String,
    pub terms: String,
    /// Total coverage duration in days (e.g. 365 for one year).
    pub duration_days: u32,
}

/// Input for creating a warranty template.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWarrantyTemplate {
    pub title: String,
    #[serde(default)]
    pub terms: String,
    pub duration_days: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Product {
        Product {
            id: ProductId::new(),
            name: "Widget".to_string(),
            description: None,
            price: Money::from_cents(5000),
            stock: 3,
            warranty_template: None,
        }
    }

    #[test]
    fn has_stock_compares_against_on_hand() {
        let product = widget();
        assert!(product.has_stock(3));
        assert!(!product.has_stock(4));
    }

    #[test]
    fn zero_quantity_is_always_satisfiable() {
        let mut product = widget();
        product.stock = 0;
        assert!(product.has_stock(0));
    }
}
