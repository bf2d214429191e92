use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use common::{CustomerId, Money, ProductId, SaleId, WarrantyTemplateId};
use domain::{
    ActivatedWarranty, CartItem, ConfirmedSale, NewProduct, NewWarrantyTemplate, PricedLine,
    Product, Sale, SaleDetail, SaleStatus, WarrantyTemplate,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{ConfirmationOutcome, MonthlyTotal, Receipt, SalesStore},
};

/// PostgreSQL-backed store implementation.
///
/// Stock discipline relies on `SELECT … FOR UPDATE` row locks; webhook
/// idempotency relies on the unique index over `sales.payment_ref`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: &PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get::<i32, _>("stock")?.max(0) as u32,
            warranty_template: row
                .try_get::<Option<Uuid>, _>("warranty_template_id")?
                .map(WarrantyTemplateId::from_uuid),
        })
    }

    fn row_to_sale(row: &PgRow) -> Result<Sale> {
        let status: String = row.try_get("status")?;
        Ok(Sale {
            id: SaleId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            status: status
                .parse::<SaleStatus>()
                .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?,
            payment_ref: row.try_get("payment_ref")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_detail(row: &PgRow) -> Result<SaleDetail> {
        Ok(SaleDetail {
            sale_id: SaleId::from_uuid(row.try_get::<Uuid, _>("sale_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get::<i32, _>("quantity")?.max(0) as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_warranty(row: &PgRow) -> Result<ActivatedWarranty> {
        Ok(ActivatedWarranty {
            id: row.try_get("id")?,
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            sale_id: SaleId::from_uuid(row.try_get::<Uuid, _>("sale_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            warranty_template_id: WarrantyTemplateId::from_uuid(
                row.try_get::<Uuid, _>("warranty_template_id")?,
            ),
            start_date: row.try_get("start_date")?,
            expiration_date: row.try_get("expiration_date")?,
        })
    }
}

#[async_trait]
impl SalesStore for PostgresStore {
    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let id = ProductId::new();
        let row = sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, stock, warranty_template_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, description, price_cents, stock, warranty_template_id
            "#,
        )
        .bind(id.as_uuid())
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price.cents())
        .bind(new.stock as i32)
        .bind(new.warranty_template.map(|t| t.as_uuid()))
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(&row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, description, price_cents, stock, warranty_template_id \
             FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, name, description, price_cents, stock, warranty_template_id \
             FROM products ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    async fn restock(&self, id: ProductId, additional: u32) -> Result<Product> {
        let row = sqlx::query(
            r#"
            UPDATE products SET stock = stock + $2
            WHERE id = $1
            RETURNING id, name, description, price_cents, stock, warranty_template_id
            "#,
        )
        .bind(id.as_uuid())
        .bind(additional as i32)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ProductNotFound(id))?;

        Self::row_to_product(&row)
    }

    async fn create_warranty_template(&self, new: NewWarrantyTemplate) -> Result<WarrantyTemplate> {
        let id = WarrantyTemplateId::new();
        sqlx::query(
            "INSERT INTO warranty_templates (id, title, terms, duration_days) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id.as_uuid())
        .bind(&new.title)
        .bind(&new.terms)
        .bind(new.duration_days as i32)
        .execute(&self.pool)
        .await?;

        Ok(WarrantyTemplate {
            id,
            title: new.title,
            terms: new.terms,
            duration_days: new.duration_days,
        })
    }

    async fn get_warranty_template(
        &self,
        id: WarrantyTemplateId,
    ) -> Result<Option<WarrantyTemplate>> {
        let row = sqlx::query(
            "SELECT id, title, terms, duration_days FROM warranty_templates WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(WarrantyTemplate {
                id: WarrantyTemplateId::from_uuid(row.try_get::<Uuid, _>("id")?),
                title: row.try_get("title")?,
                terms: row.try_get("terms")?,
                duration_days: row.try_get::<i32, _>("duration_days")?.max(0) as u32,
            })),
            None => Ok(None),
        }
    }

    async fn lock_and_price(&self, items: &[CartItem]) -> Result<Vec<PricedLine>> {
        let mut tx = self.pool.begin().await?;
        let mut lines = Vec::with_capacity(items.len());

        for item in items {
            let row = sqlx::query(
                "SELECT name, price_cents, stock FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(item.product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::ProductNotFound(item.product_id))?;

            let available = row.try_get::<i32, _>("stock")?.max(0) as u32;
            if available < item.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available,
                });
            }

            lines.push(PricedLine {
                product_id: item.product_id,
                name: row.try_get("name")?,
                quantity: item.quantity,
                unit_price: Money::from_cents(row.try_get("price_cents")?),
            });
        }

        // Commit releases the locks; nothing was mutated.
        tx.commit().await?;
        Ok(lines)
    }

    async fn record_confirmed_sale(&self, sale: ConfirmedSale) -> Result<ConfirmationOutcome> {
        let sale_id = SaleId::new();
        let mut tx = self.pool.begin().await?;

        // The unique payment_ref index makes replays land on the conflict
        // arm: no row back means another delivery already committed.
        let inserted = sqlx::query(
            r#"
            INSERT INTO sales (id, customer_id, total_cents, status, payment_ref)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (payment_ref) DO NOTHING
            RETURNING created_at
            "#,
        )
        .bind(sale_id.as_uuid())
        .bind(sale.customer_id.as_uuid())
        .bind(sale.total.cents())
        .bind(SaleStatus::Completed.as_str())
        .bind(&sale.payment_ref)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(inserted) = inserted else {
            return Ok(ConfirmationOutcome::AlreadyRecorded);
        };
        let sale_date: DateTime<Utc> = inserted.try_get("created_at")?;

        for line in &sale.lines {
            let product = sqlx::query(
                "SELECT stock, warranty_template_id FROM products WHERE id = $1 FOR UPDATE",
            )
            .bind(line.product_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::ProductNotFound(line.product_id))?;

            let available = product.try_get::<i32, _>("stock")?.max(0) as u32;
            if available < line.quantity {
                // Dropping the transaction rolls back the sale row and every
                // prior decrement; redelivery will retry the whole event.
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available,
                });
            }

            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1")
                .bind(line.product_id.as_uuid())
                .bind(line.quantity as i32)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO sale_details (id, sale_id, product_id, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(sale_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(&line.name)
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;

            if let Some(template_id) = product.try_get::<Option<Uuid>, _>("warranty_template_id")? {
                let duration_days: i32 =
                    sqlx::query_scalar("SELECT duration_days FROM warranty_templates WHERE id = $1")
                        .bind(template_id)
                        .fetch_one(&mut *tx)
                        .await?;

                let start_date = sale_date.date_naive();
                let expiration_date = start_date + Days::new(duration_days.max(0) as u64);

                sqlx::query(
                    r#"
                    INSERT INTO activated_warranties
                        (id, customer_id, sale_id, product_id, warranty_template_id, start_date, expiration_date)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(sale.customer_id.as_uuid())
                .bind(sale_id.as_uuid())
                .bind(line.product_id.as_uuid())
                .bind(template_id)
                .bind(start_date)
                .bind(expiration_date)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::debug!(%sale_id, payment_ref = %sale.payment_ref, "confirmed sale committed");
        Ok(ConfirmationOutcome::Recorded(sale_id))
    }

    async fn get_sale(&self, id: SaleId) -> Result<Option<Receipt>> {
        let row = sqlx::query(
            "SELECT id, customer_id, total_cents, status, payment_ref, created_at \
             FROM sales WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let sale = Self::row_to_sale(&row)?;

        let details = sqlx::query(
            "SELECT sale_id, product_id, product_name, quantity, unit_price_cents \
             FROM sale_details WHERE sale_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::row_to_detail)
        .collect::<Result<Vec<_>>>()?;

        let warranties = sqlx::query(
            "SELECT id, customer_id, sale_id, product_id, warranty_template_id, start_date, expiration_date \
             FROM activated_warranties WHERE sale_id = $1",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(Self::row_to_warranty)
        .collect::<Result<Vec<_>>>()?;

        Ok(Some(Receipt {
            sale,
            details,
            warranties,
        }))
    }

    async fn sales_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Sale>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, total_cents, status, payment_ref, created_at \
             FROM sales WHERE customer_id = $1 AND status = $2 \
             ORDER BY created_at DESC",
        )
        .bind(customer_id.as_uuid())
        .bind(SaleStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_sale).collect()
    }

    async fn warranties_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<ActivatedWarranty>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, sale_id, product_id, warranty_template_id, start_date, expiration_date \
             FROM activated_warranties WHERE customer_id = $1 \
             ORDER BY expiration_date",
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_warranty).collect()
    }

    async fn monthly_completed_totals(&self) -> Result<Vec<MonthlyTotal>> {
        let rows = sqlx::query(
            r#"
            SELECT date_trunc('month', created_at)::date AS month,
                   SUM(total_cents)::bigint AS total_cents
            FROM sales
            WHERE status = $1
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(SaleStatus::Completed.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(MonthlyTotal {
                    month: row.try_get::<NaiveDate, _>("month")?,
                    total: Money::from_cents(row.try_get("total_cents")?),
                })
            })
            .collect()
    }
}
