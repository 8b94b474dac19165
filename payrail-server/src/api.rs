//! Producer API handlers.
//!
//! These endpoints are called by the payment application backend to push
//! payments and refunds into the pipeline. A 200 means the event was
//! committed to every channel; the settlement itself happens later on
//! the consumer side.
//!
//! # Endpoints
//!
//! - `POST /api/v1/payments` – publish a payment for processing
//! - `POST /api/v1/refunds`  – publish a refund for processing

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post,
};
use payrail_core::publisher::PublishError;
use payrail_sdk::objects::{PaymentRequest, RefundRequest};
use rust_decimal::Decimal;

use crate::state::AppState;

/// Build the producer API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/payments", post(create_payment))
        .route("/api/v1/refunds", post(create_refund))
}

/// Producer API errors.
#[derive(Debug)]
enum ApiError {
    /// The request amount is zero or negative.
    InvalidAmount,
    /// The transactional publish failed (compensation has already run).
    Publish(PublishError),
}

impl From<PublishError> for ApiError {
    fn from(e: PublishError) -> Self {
        ApiError::Publish(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::InvalidAmount => {
                (StatusCode::BAD_REQUEST, "amount must be positive").into_response()
            }
            ApiError::Publish(e) => {
                tracing::error!(error = %e, "Producer API publish error");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to publish event").into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// POST /api/v1/payments
// ---------------------------------------------------------------------------

/// Accept a payment and publish it to the pipeline.
///
/// Responds with the accepted event, stamped `SUCCESS`.
async fn create_payment(
    state: State<AppState>,
    Json(body): Json<PaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.amount <= Decimal::ZERO {
        return Err(ApiError::InvalidAmount);
    }

    let event = state.publisher.send_payment(body).await?;
    Ok(Json(event))
}

// ---------------------------------------------------------------------------
// POST /api/v1/refunds
// ---------------------------------------------------------------------------

/// Accept a refund and publish it to the pipeline.
async fn create_refund(
    state: State<AppState>,
    Json(body): Json<RefundRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.amount <= Decimal::ZERO {
        return Err(ApiError::InvalidAmount);
    }

    let event = state.publisher.send_refund(body).await?;
    Ok(Json(event))
}
