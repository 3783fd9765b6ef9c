//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client (malformed IDs, bodies).
    BadRequest(String),
    /// Error surfaced by the checkout services.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    let status = match &err {
        CheckoutError::InvalidArgument(_)
        | CheckoutError::EmptyCart
        | CheckoutError::Coupon(_) => StatusCode::BAD_REQUEST,
        CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::Forbidden(_) => StatusCode::FORBIDDEN,
        CheckoutError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        CheckoutError::DuplicateItem { .. }
        | CheckoutError::OutOfStock { .. }
        | CheckoutError::StockExhausted { .. }
        | CheckoutError::AlreadyPaid(_)
        | CheckoutError::InvalidState { .. }
        | CheckoutError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CheckoutError::Gateway(_) => StatusCode::BAD_GATEWAY,
        CheckoutError::Unavailable(_) => {
            tracing::error!(error = %err, "store unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    (status, err.to_string())
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
