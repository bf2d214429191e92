//! HTTP API server with observability for the storefront system.
//!
//! Exposes checkout (intent + webhook), forecasting, catalog and ledger
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{CheckoutCoordinator, PaymentGateway};
use forecast::ForecastService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::SalesStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: SalesStore, G: PaymentGateway> {
    pub store: S,
    pub coordinator: CheckoutCoordinator<S, G>,
    pub forecast: ForecastService<S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G>(state: Arc<AppState<S, G>>, metrics_handle: PrometheusHandle) -> Router
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout/intent", post(routes::checkout::create_intent::<S, G>))
        .route("/checkout/webhook", post(routes::checkout::webhook::<S, G>))
        .route("/forecast/historical", get(routes::forecast::historical::<S, G>))
        .route("/forecast/predict", get(routes::forecast::predict::<S, G>))
        .route("/forecast/train", post(routes::forecast::train::<S, G>))
        .route(
            "/products",
            get(routes::catalog::list::<S, G>).post(routes::catalog::create::<S, G>),
        )
        .route("/products/{id}", get(routes::catalog::get::<S, G>))
        .route("/warranties", post(routes::catalog::create_warranty::<S, G>))
        .route("/sales/{id}", get(routes::sales::receipt::<S, G>))
        .route("/customers/{id}/purchases", get(routes::sales::purchases::<S, G>))
        .route("/customers/{id}/warranties", get(routes::sales::warranties::<S, G>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
