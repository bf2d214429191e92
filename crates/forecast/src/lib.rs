//! Sales forecasting pipeline.
//!
//! Offline from checkout: reads completed sales out of the ledger, buckets
//! them by calendar month, derives lag features, fits a regression model
//! and predicts the next month's revenue. The trained model and its
//! feature-column order are persisted together as one JSON artifact and
//! only ever used together — a handle swap is the only way readers see a
//! new model.

pub mod artifact;
pub mod dataset;
pub mod error;
pub mod model;
pub mod service;

pub use artifact::{ForecastModelHandle, ModelArtifact};
pub use dataset::{Dataset, FeatureRow, MIN_MONTHS, build_dataset, fill_month_gaps, latest_lags};
pub use error::{ForecastError, Result};
pub use model::{Evaluation, FEATURE_COLUMNS, SalesModel, train};
pub use service::{ForecastService, Prediction};
