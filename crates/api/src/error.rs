//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, GatewayError};
use forecast::ForecastError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout flow error.
    Checkout(CheckoutError),
    /// Forecast pipeline error.
    Forecast(ForecastError),
    /// Store error outside a checkout flow.
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Forecast(err) => forecast_error_to_response(&err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::Cart(_)
        | CheckoutError::SignatureInvalid(_)
        | CheckoutError::MalformedEvent(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        // The gateway being unwell is not the client's fault; callers may
        // retry the checkout.
        CheckoutError::Gateway(
            GatewayError::Unreachable(_) | GatewayError::Rejected { .. } | GatewayError::InvalidResponse(_),
        ) => (StatusCode::BAD_GATEWAY, err.to_string()),
        CheckoutError::Store(store_err) => match store_err {
            StoreError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
            StoreError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
            _ => {
                tracing::error!(error = %err, "checkout store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        },
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    match &err {
        StoreError::InsufficientStock { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        StoreError::ProductNotFound(_)
        | StoreError::SaleNotFound(_)
        | StoreError::WarrantyTemplateNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        _ => {
            tracing::error!(error = %err, "store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn forecast_error_to_response(err: &ForecastError) -> (StatusCode, String) {
    match err {
        // Surfaced as 500 with retry-after-repopulate guidance in the
        // message; there is nothing the client can correct in the request.
        ForecastError::InsufficientHistory { .. } | ForecastError::ModelUnavailable => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        ForecastError::Store(store_err) => {
            tracing::error!(error = %store_err, "forecast store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        _ => {
            tracing::error!(error = %err, "forecast failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        ApiError::Forecast(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
