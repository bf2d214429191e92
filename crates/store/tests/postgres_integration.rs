//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container for efficiency. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{CustomerId, Money};
use domain::{
    CartItem, ConfirmedSale, NewProduct, NewWarrantyTemplate, PricedLine, Product, SaleStatus,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{ConfirmationOutcome, PostgresStore, SalesStore, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/001_create_ledger_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE activated_warranties, sale_details, sales, products, warranty_templates")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

async fn seed_product(store: &PostgresStore, name: &str, cents: i64, stock: u32) -> Product {
    store
        .create_product(NewProduct {
            name: name.to_string(),
            description: None,
            price: Money::from_cents(cents),
            stock,
            warranty_template: None,
        })
        .await
        .unwrap()
}

fn confirmed(customer: CustomerId, payment_ref: &str, lines: Vec<PricedLine>) -> ConfirmedSale {
    let total = domain::cart_total(&lines);
    ConfirmedSale {
        customer_id: customer,
        payment_ref: payment_ref.to_string(),
        total,
        lines,
    }
}

#[tokio::test]
#[serial]
async fn create_and_fetch_product() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 5000, 10).await;

    let fetched = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(fetched, product);

    let all = store.list_products().await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
#[serial]
async fn lock_and_price_validates_stock() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 5000, 2).await;

    let lines = store
        .lock_and_price(&[CartItem {
            product_id: product.id,
            quantity: 2,
        }])
        .await
        .unwrap();
    assert_eq!(lines[0].unit_price.cents(), 5000);

    let too_many = store
        .lock_and_price(&[CartItem {
            product_id: product.id,
            quantity: 3,
        }])
        .await;
    assert!(matches!(
        too_many,
        Err(StoreError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        })
    ));
}

#[tokio::test]
#[serial]
async fn confirmation_commits_everything_atomically() {
    let store = get_test_store().await;
    let template = store
        .create_warranty_template(NewWarrantyTemplate {
            title: "One year".to_string(),
            terms: "Parts and labor".to_string(),
            duration_days: 365,
        })
        .await
        .unwrap();
    let covered = store
        .create_product(NewProduct {
            name: "Laptop".to_string(),
            description: None,
            price: Money::from_cents(5000),
            stock: 10,
            warranty_template: Some(template.id),
        })
        .await
        .unwrap();
    let plain = seed_product(&store, "Mouse", 3000, 5).await;

    let customer = CustomerId::new();
    let lines = store
        .lock_and_price(&[
            CartItem {
                product_id: covered.id,
                quantity: 2,
            },
            CartItem {
                product_id: plain.id,
                quantity: 1,
            },
        ])
        .await
        .unwrap();

    let outcome = store
        .record_confirmed_sale(confirmed(customer, "pi_commit", lines))
        .await
        .unwrap();
    let ConfirmationOutcome::Recorded(sale_id) = outcome else {
        panic!("expected a recorded sale");
    };

    let receipt = store.get_sale(sale_id).await.unwrap().unwrap();
    assert_eq!(receipt.sale.total.cents(), 13000);
    assert_eq!(receipt.sale.status, SaleStatus::Completed);
    assert_eq!(receipt.details.len(), 2);
    assert_eq!(receipt.warranties.len(), 1);
    for warranty in &receipt.warranties {
        assert_eq!(
            warranty.expiration_date,
            warranty.start_date + chrono::Days::new(365)
        );
    }

    assert_eq!(store.get_product(covered.id).await.unwrap().unwrap().stock, 8);
    assert_eq!(store.get_product(plain.id).await.unwrap().unwrap().stock, 4);
}

#[tokio::test]
#[serial]
async fn replayed_delivery_creates_exactly_one_sale() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 5000, 10).await;
    let customer = CustomerId::new();

    let lines = store
        .lock_and_price(&[CartItem {
            product_id: product.id,
            quantity: 1,
        }])
        .await
        .unwrap();

    let first = store
        .record_confirmed_sale(confirmed(customer, "pi_replay", lines.clone()))
        .await
        .unwrap();
    assert!(matches!(first, ConfirmationOutcome::Recorded(_)));

    let second = store
        .record_confirmed_sale(confirmed(customer, "pi_replay", lines))
        .await
        .unwrap();
    assert_eq!(second, ConfirmationOutcome::AlreadyRecorded);

    let sales = store.sales_for_customer(customer).await.unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 9);
}

#[tokio::test]
#[serial]
async fn oversell_attempt_rolls_back_whole_confirmation() {
    let store = get_test_store().await;
    let a = seed_product(&store, "A", 5000, 10).await;
    let b = seed_product(&store, "B", 3000, 1).await;
    let customer = CustomerId::new();

    let lines = vec![
        PricedLine {
            product_id: a.id,
            name: a.name.clone(),
            quantity: 2,
            unit_price: a.price,
        },
        PricedLine {
            product_id: b.id,
            name: b.name.clone(),
            quantity: 2,
            unit_price: b.price,
        },
    ];

    let result = store
        .record_confirmed_sale(confirmed(customer, "pi_oversell", lines))
        .await;
    assert!(matches!(result, Err(StoreError::InsufficientStock { .. })));

    // Nothing committed: no sale row, no decrement on either product.
    assert!(store.sales_for_customer(customer).await.unwrap().is_empty());
    assert_eq!(store.get_product(a.id).await.unwrap().unwrap().stock, 10);
    assert_eq!(store.get_product(b.id).await.unwrap().unwrap().stock, 1);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn concurrent_confirmations_serialize_on_the_row_lock() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Scarce", 5000, 6).await;
    let customer = CustomerId::new();

    let line = PricedLine {
        product_id: product.id,
        name: product.name.clone(),
        quantity: 3,
        unit_price: product.price,
    };

    let store_a = store.clone();
    let store_b = store.clone();
    let line_a = line.clone();
    let line_b = line;
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move {
            store_a
                .record_confirmed_sale(confirmed(customer, "pi_left", vec![line_a]))
                .await
        }),
        tokio::spawn(async move {
            store_b
                .record_confirmed_sale(confirmed(customer, "pi_right", vec![line_b]))
                .await
        }),
    );
    assert!(ra.unwrap().is_ok());
    assert!(rb.unwrap().is_ok());

    // 6 - 3 - 3 = 0, exactly; the row lock prevents a lost update.
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 0);
}

#[tokio::test]
#[serial]
async fn monthly_totals_aggregate_completed_sales() {
    let store = get_test_store().await;
    let customer = CustomerId::new();

    // Seed sales with explicit timestamps, including a non-completed one
    // that must not count.
    for (cents, status, ts) in [
        (10_000_i64, "COMPLETED", "2024-01-05T10:00:00Z"),
        (5_000, "COMPLETED", "2024-01-20T10:00:00Z"),
        (20_000, "COMPLETED", "2024-03-02T10:00:00Z"),
        (99_000, "PENDING", "2024-03-10T10:00:00Z"),
    ] {
        sqlx::query(
            "INSERT INTO sales (id, customer_id, total_cents, status, payment_ref, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6::timestamptz)",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(customer.as_uuid())
        .bind(cents)
        .bind(status)
        .bind(format!("pi_hist_{}", uuid::Uuid::new_v4()))
        .bind(ts)
        .execute(store.pool())
        .await
        .unwrap();
    }

    let totals = store.monthly_completed_totals().await.unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!(
        totals[0].month,
        chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    );
    assert_eq!(totals[0].total.cents(), 15_000);
    assert_eq!(
        totals[1].month,
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    );
    assert_eq!(totals[1].total.cents(), 20_000);
}

#[tokio::test]
#[serial]
async fn restock_adds_to_existing_stock() {
    let store = get_test_store().await;
    let product = seed_product(&store, "Widget", 5000, 2).await;

    let updated = store.restock(product.id, 5).await.unwrap();
    assert_eq!(updated.stock, 7);

    let missing = store.restock(common::ProductId::new(), 1).await;
    assert!(matches!(missing, Err(StoreError::ProductNotFound(_))));
}
