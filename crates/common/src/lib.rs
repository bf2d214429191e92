//! Shared types for the storefront system.
//!
//! Identifier newtypes keep UUIDs for different entities from being mixed
//! up, and [`Money`] keeps all amounts in integer minor units.

pub mod ids;
pub mod money;

pub use ids::{CustomerId, ProductId, SaleId, WarrantyTemplateId};
pub use money::Money;
