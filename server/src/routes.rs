//! HTTP routes and handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::RwLock;
use ratebridge_common::{RateError, RateRequest, RateResponse, StoreError};
use ratebridge_resolver::{RateResolver, ResolveOptions, SharedMetrics};
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<RateResolver>,
    pub options: Arc<RwLock<ResolveOptions>>,
    pub metrics: SharedMetrics,
}

/// Build the service router.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/rates/:from/:to", get(get_rate))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn get_rate(
    State(state): State<AppState>,
    Path((from, to)): Path<(String, String)>,
) -> Result<Json<RateResponse>, ApiError> {
    let request = RateRequest::new(from, to);
    let options = *state.options.read();
    let response = state.resolver.resolve(&request, options).await?;
    Ok(Json(response))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

/// Error payload returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
}

/// Wraps resolution failures with their HTTP status.
pub struct ApiError(RateError);

impl From<RateError> for ApiError {
    fn from(err: RateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RateError::InvalidExchangeRate { .. } => StatusCode::BAD_REQUEST,
            RateError::RateLimitExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            RateError::Gateway(_) => StatusCode::BAD_GATEWAY,
            RateError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            RateError::Store(StoreError::Internal(_)) | RateError::Publish(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = ErrorBody {
            status: status.as_u16(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
