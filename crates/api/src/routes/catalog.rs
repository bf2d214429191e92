//! Catalog endpoints: products and warranty templates.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::PaymentGateway;
use common::ProductId;
use domain::{NewProduct, NewWarrantyTemplate, Product, WarrantyTemplate};
use store::SalesStore;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// GET /products — list the catalog.
#[tracing::instrument(skip(state))]
pub async fn list<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<Vec<Product>>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    Ok(Json(state.store.list_products().await?))
}

/// GET /products/{id} — fetch one product.
#[tracing::instrument(skip(state))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let id = ProductId::from_uuid(id);
    state
        .store
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("product {id} not found")))
}

/// POST /products — create a product.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("product name must not be empty".to_string()));
    }
    let product = state.store.create_product(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// POST /warranties — create a warranty template.
#[tracing::instrument(skip(state, req))]
pub async fn create_warranty<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<NewWarrantyTemplate>,
) -> Result<(StatusCode, Json<WarrantyTemplate>), ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    if req.duration_days == 0 {
        return Err(ApiError::BadRequest(
            "warranty duration must be at least one day".to_string(),
        ));
    }
    let template = state.store.create_warranty_template(req).await?;
    Ok((StatusCode::CREATED, Json(template)))
}
