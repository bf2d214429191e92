use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, Money, ProductId, SaleId, WarrantyTemplateId};
use domain::{
    ActivatedWarranty, CartItem, ConfirmedSale, NewProduct, NewWarrantyTemplate, PricedLine,
    Product, Sale, SaleDetail, SaleStatus, WarrantyTemplate,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{ConfirmationOutcome, MonthlyTotal, Receipt, SalesStore},
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    templates: HashMap<WarrantyTemplateId, WarrantyTemplate>,
    sales: Vec<Sale>,
    details: Vec<SaleDetail>,
    warranties: Vec<ActivatedWarranty>,
}

/// In-memory store implementation for testing.
///
/// All tables live behind a single `RwLock`, so confirmations serialize on
/// the write lock exactly like the row-locked PostgreSQL path, and every
/// commit is naturally all-or-nothing (validation happens before any
/// mutation).
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of sales in the ledger.
    pub async fn sale_count(&self) -> usize {
        self.state.read().await.sales.len()
    }

    /// Seeds a completed sale with an explicit timestamp. Test helper for
    /// building monthly history without going through checkout.
    pub async fn insert_completed_sale_at(
        &self,
        customer_id: CustomerId,
        total: Money,
        created_at: DateTime<Utc>,
    ) -> Sale {
        let sale = Sale {
            id: SaleId::new(),
            customer_id,
            total,
            status: SaleStatus::Completed,
            payment_ref: format!("pi_seed_{}", SaleId::new()),
            created_at,
        };
        self.state.write().await.sales.push(sale.clone());
        sale
    }
}

#[async_trait]
impl SalesStore for InMemoryStore {
    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            warranty_template: new.warranty_template,
        };
        self.state
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn restock(&self, id: ProductId, additional: u32) -> Result<Product> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(StoreError::ProductNotFound(id))?;
        product.stock += additional;
        Ok(product.clone())
    }

    async fn create_warranty_template(&self, new: NewWarrantyTemplate) -> Result<WarrantyTemplate> {
        let template = WarrantyTemplate {
            id: WarrantyTemplateId::new(),
            title: new.title,
            terms: new.terms,
            duration_days: new.duration_days,
        };
        self.state
            .write()
            .await
            .templates
            .insert(template.id, template.clone());
        Ok(template)
    }

    async fn get_warranty_template(
        &self,
        id: WarrantyTemplateId,
    ) -> Result<Option<WarrantyTemplate>> {
        Ok(self.state.read().await.templates.get(&id).cloned())
    }

    async fn lock_and_price(&self, items: &[CartItem]) -> Result<Vec<PricedLine>> {
        let state = self.state.read().await;
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            let product = state
                .products
                .get(&item.product_id)
                .ok_or(StoreError::ProductNotFound(item.product_id))?;

            if !product.has_stock(item.quantity) {
                return Err(StoreError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }

            lines.push(PricedLine {
                product_id: item.product_id,
                name: product.name.clone(),
                quantity: item.quantity,
                unit_price: product.price,
            });
        }

        Ok(lines)
    }

    async fn record_confirmed_sale(&self, sale: ConfirmedSale) -> Result<ConfirmationOutcome> {
        let mut state = self.state.write().await;

        if state.sales.iter().any(|s| s.payment_ref == sale.payment_ref) {
            return Ok(ConfirmationOutcome::AlreadyRecorded);
        }

        // Validate before touching anything so a failure leaves the state
        // exactly as it was. Quantities are summed per product first; two
        // lines for the same product must not pass individually and then
        // overdraw together.
        let mut required: HashMap<ProductId, u32> = HashMap::new();
        for line in &sale.lines {
            *required.entry(line.product_id).or_insert(0) += line.quantity;
        }
        for (product_id, quantity) in &required {
            let product = state
                .products
                .get(product_id)
                .ok_or(StoreError::ProductNotFound(*product_id))?;
            if !product.has_stock(*quantity) {
                return Err(StoreError::InsufficientStock {
                    product_id: *product_id,
                    requested: *quantity,
                    available: product.stock,
                });
            }
        }

        let sale_id = SaleId::new();
        let created_at = Utc::now();
        let start_date = created_at.date_naive();

        for line in &sale.lines {
            let template_id = {
                let product = state
                    .products
                    .get_mut(&line.product_id)
                    .ok_or(StoreError::ProductNotFound(line.product_id))?;
                product.stock -= line.quantity;
                product.warranty_template
            };

            state.details.push(SaleDetail {
                sale_id,
                product_id: line.product_id,
                product_name: line.name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            });

            if let Some(template_id) = template_id {
                let template = state
                    .templates
                    .get(&template_id)
                    .ok_or(StoreError::WarrantyTemplateNotFound(template_id))?
                    .clone();
                state.warranties.push(ActivatedWarranty::activate(
                    sale.customer_id,
                    sale_id,
                    line.product_id,
                    &template,
                    start_date,
                ));
            }
        }

        state.sales.push(Sale {
            id: sale_id,
            customer_id: sale.customer_id,
            total: sale.total,
            status: SaleStatus::Completed,
            payment_ref: sale.payment_ref,
            created_at,
        });

        Ok(ConfirmationOutcome::Recorded(sale_id))
    }

    async fn get_sale(&self, id: SaleId) -> Result<Option<Receipt>> {
        let state = self.state.read().await;
        let Some(sale) = state.sales.iter().find(|s| s.id == id).cloned() else {
            return Ok(None);
        };
        let details = state
            .details
            .iter()
            .filter(|d| d.sale_id == id)
            .cloned()
            .collect();
        let warranties = state
            .warranties
            .iter()
            .filter(|w| w.sale_id == id)
            .cloned()
            .collect();
        Ok(Some(Receipt {
            sale,
            details,
            warranties,
        }))
    }

    async fn sales_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Sale>> {
        let state = self.state.read().await;
        let mut sales: Vec<_> = state
            .sales
            .iter()
            .filter(|s| s.customer_id == customer_id && s.status == SaleStatus::Completed)
            .cloned()
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sales)
    }

    async fn warranties_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<ActivatedWarranty>> {
        let state = self.state.read().await;
        let mut warranties: Vec<_> = state
            .warranties
            .iter()
            .filter(|w| w.customer_id == customer_id)
            .cloned()
            .collect();
        warranties.sort_by_key(|w| w.expiration_date);
        Ok(warranties)
    }

    async fn monthly_completed_totals(&self) -> Result<Vec<MonthlyTotal>> {
        use std::collections::BTreeMap;

        use chrono::Datelike;

        let state = self.state.read().await;
        let mut buckets: BTreeMap<chrono::NaiveDate, i64> = BTreeMap::new();
        for sale in &state.sales {
            if sale.status != SaleStatus::Completed {
                continue;
            }
            let month = sale.created_at.date_naive().with_day(1).unwrap_or_else(|| {
                sale.created_at.date_naive()
            });
            *buckets.entry(month).or_insert(0) += sale.total.cents();
        }

        Ok(buckets
            .into_iter()
            .map(|(month, cents)| MonthlyTotal {
                month,
                total: Money::from_cents(cents),
            })
            .collect())
    }
}
