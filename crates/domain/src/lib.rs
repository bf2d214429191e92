//! Domain layer for the storefront system.
//!
//! This crate provides the core domain types:
//! - catalog: products and reusable warranty templates
//! - cart: transient checkout input and priced line snapshots
//! - sale: the order ledger (sales, line items, activated warranties)
//!
//! Persistence lives behind the repository trait in the `store` crate; the
//! types here carry the invariants, not the storage mechanics.

pub mod cart;
pub mod catalog;
pub mod sale;

pub use cart::{CartError, CartItem, PricedLine, cart_total, validate_cart};
pub use catalog::{NewProduct, NewWarrantyTemplate, Product, WarrantyTemplate};
pub use sale::{ActivatedWarranty, ConfirmedSale, Sale, SaleDetail, SaleStatus};
