//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::{AppState, create_app};
use checkout::{CheckoutCoordinator, StripeGateway, WebhookVerifier};
use forecast::{ForecastModelHandle, ForecastService};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryStore, PostgresStore, SalesStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S>(store: S, config: Config, metrics_handle: PrometheusHandle)
where
    S: SalesStore + Clone + 'static,
{
    let gateway =
        StripeGateway::new(&config.gateway_secret_key).expect("failed to build gateway client");
    let verifier = WebhookVerifier::new(&config.webhook_secret);
    let coordinator = CheckoutCoordinator::new(store.clone(), gateway, verifier)
        .with_currency(&config.currency);

    let model_handle = Arc::new(ForecastModelHandle::new(&config.model_path));
    match model_handle.refresh() {
        Ok(Some(artifact)) => {
            tracing::info!(trained_at = %artifact.trained_at, "loaded model artifact");
        }
        Ok(None) => tracing::info!("no model artifact yet; first prediction will train"),
        Err(e) => tracing::warn!(error = %e, "could not load model artifact"),
    }
    let forecast = ForecastService::new(store.clone(), model_handle);

    let state = Arc::new(AppState {
        store,
        coordinator,
        forecast,
    });
    let app = create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let config = Config::from_env();

    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to database");
            let store = PostgresStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            serve(store, config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set; running on the in-memory store");
            serve(InMemoryStore::new(), config, metrics_handle).await;
        }
    }
}
