use common::{ProductId, SaleId, WarrantyTemplateId};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The referenced sale does not exist.
    #[error("sale not found: {0}")]
    SaleNotFound(SaleId),

    /// The referenced warranty template does not exist.
    #[error("warranty template not found: {0}")]
    WarrantyTemplateNotFound(WarrantyTemplateId),

    /// A requested quantity exceeds the available stock. Raised under the
    /// product's row lock, both at intent pricing and at confirmation.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
