//! Forecast endpoints: historical series, prediction, retraining.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use checkout::PaymentGateway;
use serde::Serialize;
use store::SalesStore;

use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct HistoricalPoint {
    /// Month start as `YYYY-MM-DD`.
    pub date: String,
    /// Completed-sale revenue for the month, in major units.
    pub total_sales: f64,
}

#[derive(Serialize)]
pub struct PredictionResponse {
    pub prediction_period: String,
    pub predicted_sales: f64,
}

#[derive(Serialize)]
pub struct TrainResponse {
    pub r2: f64,
    pub rmse: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// GET /forecast/historical — monthly revenue series for the dashboard.
#[tracing::instrument(skip(state))]
pub async fn historical<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<Vec<HistoricalPoint>>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let series = state.forecast.historical().await?;
    let points = series
        .into_iter()
        .map(|m| HistoricalPoint {
            date: m.month.format("%Y-%m-%d").to_string(),
            total_sales: m.total.as_major_units(),
        })
        .collect();
    Ok(Json(points))
}

/// GET /forecast/predict — next month's predicted revenue.
#[tracing::instrument(skip(state))]
pub async fn predict<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<PredictionResponse>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let prediction = state.forecast.predict_next_month().await?;
    Ok(Json(PredictionResponse {
        prediction_period: prediction.period,
        predicted_sales: prediction.predicted_total.as_major_units(),
    }))
}

/// POST /forecast/train — retrain the model from current ledger data.
#[tracing::instrument(skip(state))]
pub async fn train<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<TrainResponse>, ApiError>
where
    S: SalesStore + Clone + 'static,
    G: PaymentGateway + 'static,
{
    let evaluation = state.forecast.train().await?;
    Ok(Json(TrainResponse {
        r2: evaluation.r2,
        rmse: evaluation.rmse / 100.0,
        train_rows: evaluation.train_rows,
        test_rows: evaluation.test_rows,
    }))
}
