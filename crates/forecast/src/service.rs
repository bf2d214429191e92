//! Forecast service tying the ledger, the model and the artifact handle
//! together.

use std::sync::Arc;

use chrono::Datelike;
use common::Money;
use serde::Serialize;
use store::{MonthlyTotal, SalesStore};

use crate::artifact::{ForecastModelHandle, ModelArtifact};
use crate::dataset::{build_dataset, fill_month_gaps, latest_lags};
use crate::error::{ForecastError, Result};
use crate::model::{Evaluation, train};

/// Predicted revenue for an upcoming month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    /// Target period as `YYYY-MM`.
    pub period: String,
    pub predicted_total: Money,
}

/// High-level forecasting operations. Batch/offline: nothing here runs on
/// the checkout path.
pub struct ForecastService<S> {
    store: S,
    handle: Arc<ForecastModelHandle>,
}

impl<S: SalesStore> ForecastService<S> {
    /// Creates a service reading history from `store` and keeping its
    /// model in `handle`.
    pub fn new(store: S, handle: Arc<ForecastModelHandle>) -> Self {
        Self { store, handle }
    }

    /// The model handle (shared with whoever wants to refresh explicitly).
    pub fn handle(&self) -> &Arc<ForecastModelHandle> {
        &self.handle
    }

    /// Monthly revenue series of completed sales, as observed (no gap
    /// filling) — dashboard data.
    pub async fn historical(&self) -> Result<Vec<MonthlyTotal>> {
        Ok(self.store.monthly_completed_totals().await?)
    }

    /// Rebuilds the dataset from the ledger, trains a fresh model and
    /// installs it as the current artifact.
    #[tracing::instrument(skip(self))]
    pub async fn train(&self) -> Result<Evaluation> {
        let totals = self.store.monthly_completed_totals().await?;
        let dataset = build_dataset(&totals)?;
        let (model, evaluation) = train(&dataset)?;

        tracing::info!(
            r2 = evaluation.r2,
            rmse = evaluation.rmse,
            rows = dataset.rows.len(),
            "trained sales forecast model"
        );
        self.handle.install(ModelArtifact::new(model, evaluation))?;
        Ok(evaluation)
    }

    /// Predicts the month following the latest observed month.
    ///
    /// Prefers the loaded artifact; falls back to the persisted file, and
    /// finally retrains on demand. `ModelUnavailable` only surfaces when
    /// even retraining can't produce a model.
    #[tracing::instrument(skip(self))]
    pub async fn predict_next_month(&self) -> Result<Prediction> {
        let artifact = match self.handle.current() {
            Some(artifact) => artifact,
            None => match self.handle.refresh()? {
                Some(artifact) => artifact,
                None => {
                    tracing::warn!("no model artifact present, retraining on demand");
                    self.train().await?;
                    self.handle
                        .current()
                        .ok_or(ForecastError::ModelUnavailable)?
                }
            },
        };

        let totals = fill_month_gaps(&self.store.monthly_completed_totals().await?);
        let Some((period, lags)) = latest_lags(&totals) else {
            return Err(ForecastError::InsufficientHistory {
                available: 0,
                required: 1,
            });
        };

        // Assemble the feature vector by the artifact's own column order;
        // the model never sees features in any other arrangement.
        let features = artifact
            .feature_columns
            .iter()
            .map(|column| match column.as_str() {
                "year" => Ok(f64::from(period.year())),
                "month" => Ok(f64::from(period.month())),
                "sales_lag_1" => Ok(lags[0]),
                "sales_lag_2" => Ok(lags[1]),
                "sales_lag_3" => Ok(lags[2]),
                other => Err(ForecastError::UnknownFeature(other.to_string())),
            })
            .collect::<Result<Vec<f64>>>()?;

        let predicted = artifact.model.predict(&features)?;
        Ok(Prediction {
            period: period.format("%Y-%m").to_string(),
            predicted_total: Money::from_cents(predicted.round() as i64),
        })
    }
}
