//! Ledger endpoints: receipts, purchase history, warranties.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::PaymentGateway;
use common::{CustomerId, SaleId};
use domain::{ActivatedWarranty, Sale};
use store::{Receipt, SalesStore};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// GET /sales/{id} — a full receipt: sale, line items, warranties.
#[tracing::instrument(skip(state))]
pub async fn receipt<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Receipt>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let id = SaleId::from_uuid(id);
    state
        .store
        .get_sale(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("sale {id} not found")))
}

/// GET /customers/{id}/purchases — the customer's completed sales, newest
/// first.
#[tracing::instrument(skip(state))]
pub async fn purchases<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Sale>>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let customer_id = CustomerId::from_uuid(id);
    Ok(Json(state.store.sales_for_customer(customer_id).await?))
}

/// GET /customers/{id}/warranties — the customer's activated warranties,
/// soonest expiration first.
#[tracing::instrument(skip(state))]
pub async fn warranties<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ActivatedWarranty>>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let customer_id = CustomerId::from_uuid(id);
    Ok(Json(state.store.warranties_for_customer(customer_id).await?))
}
