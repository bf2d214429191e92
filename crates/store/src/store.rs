use async_trait::async_trait;
use chrono::NaiveDate;
use common::{CustomerId, Money, ProductId, SaleId, WarrantyTemplateId};
use domain::{
    ActivatedWarranty, CartItem, ConfirmedSale, NewProduct, NewWarrantyTemplate, PricedLine,
    Product, Sale, SaleDetail, WarrantyTemplate,
};
use serde::Serialize;

use crate::Result;

/// Outcome of [`SalesStore::record_confirmed_sale`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// The sale, its details, warranties and stock decrements were committed.
    Recorded(SaleId),

    /// A sale with this payment reference already exists. The attempt was a
    /// no-op; replayed webhook deliveries land here.
    AlreadyRecorded,
}

/// A sale joined with its line items and activated warranties.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    pub sale: Sale,
    pub details: Vec<SaleDetail>,
    pub warranties: Vec<ActivatedWarranty>,
}

/// Total revenue of completed sales in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyTotal {
    /// First day of the month.
    pub month: NaiveDate,
    pub total: Money,
}

/// Repository interface over the catalog and the order ledger.
///
/// All implementations must be thread-safe (Send + Sync). Stock mutation
/// follows a single-writer-per-row discipline: every method that reads
/// stock for a decision holds an exclusive lock on the product row for the
/// duration of its transaction, so concurrent confirmations for the same
/// product serialize instead of overselling.
#[async_trait]
pub trait SalesStore: Send + Sync {
    // -- catalog --

    /// Creates a product and returns it with its assigned id.
    async fn create_product(&self, new: NewProduct) -> Result<Product>;

    /// Fetches a product by id. Returns None if it doesn't exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists all products, name-ordered.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Adds stock to a product (admin restock). Returns the updated product.
    async fn restock(&self, id: ProductId, additional: u32) -> Result<Product>;

    /// Creates a warranty template and returns it with its assigned id.
    async fn create_warranty_template(&self, new: NewWarrantyTemplate) -> Result<WarrantyTemplate>;

    /// Fetches a warranty template by id.
    async fn get_warranty_template(
        &self,
        id: WarrantyTemplateId,
    ) -> Result<Option<WarrantyTemplate>>;

    // -- checkout --

    /// Prices a cart against live stock under exclusive row locks.
    ///
    /// Fails with `InsufficientStock` or `ProductNotFound`; otherwise
    /// returns one [`PricedLine`] per item with the name and unit price
    /// captured at this instant. The locks are released when the pricing
    /// transaction ends — the check is advisory and stock is re-validated
    /// by [`Self::record_confirmed_sale`].
    async fn lock_and_price(&self, items: &[CartItem]) -> Result<Vec<PricedLine>>;

    /// Commits a confirmed sale in one atomic transaction.
    ///
    /// Re-acquires the row lock on every referenced product, re-validates
    /// stock, inserts the sale (COMPLETED), one detail per line at the
    /// captured unit price, an activated warranty for each product that
    /// currently carries a template, and decrements stock. A duplicate
    /// payment reference short-circuits to `AlreadyRecorded` without side
    /// effects; any error rolls back the entire set of mutations.
    async fn record_confirmed_sale(&self, sale: ConfirmedSale) -> Result<ConfirmationOutcome>;

    // -- ledger queries --

    /// Loads a sale with its details and warranties.
    async fn get_sale(&self, id: SaleId) -> Result<Option<Receipt>>;

    /// Lists a customer's completed sales, newest first.
    async fn sales_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Sale>>;

    /// Lists a customer's activated warranties, soonest expiration first.
    async fn warranties_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<ActivatedWarranty>>;

    // -- forecasting --

    /// Totals of COMPLETED sales grouped by calendar month, ordered by
    /// month. Months with no sales are absent; the forecast pipeline fills
    /// the gaps.
    async fn monthly_completed_totals(&self) -> Result<Vec<MonthlyTotal>>;
}
