//! Application configuration loaded from environment variables.

use std::path::PathBuf;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — PostgreSQL connection string; when unset the server
///   runs on the in-memory store (development only)
/// - `STRIPE_SECRET_KEY` — gateway API key
/// - `STRIPE_WEBHOOK_SECRET` — shared secret for webhook signatures
/// - `CURRENCY` — charge currency code (default: `"usd"`)
/// - `FORECAST_MODEL_PATH` — model artifact file (default:
///   `"data/sales_model.json"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub gateway_secret_key: String,
    pub webhook_secret: String,
    pub currency: String,
    pub model_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL").ok(),
            gateway_secret_key: std::env::var("STRIPE_SECRET_KEY")
                .unwrap_or_else(|_| "sk_test_placeholder".to_string()),
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "whsec_placeholder".to_string()),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            model_path: std::env::var("FORECAST_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/sales_model.json")),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            gateway_secret_key: "sk_test_placeholder".to_string(),
            webhook_secret: "whsec_placeholder".to_string(),
            currency: "usd".to_string(),
            model_path: PathBuf::from("data/sales_model.json"),
        }
    }
}
