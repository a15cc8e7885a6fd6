//! API Error Mapping
//!
//! Every HTTP failure surfaces as a JSON `{"error": message}` body with
//! a matching status code — clients never see a bare string or an
//! empty 200.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Market with ID {0} not found")]
    MarketNotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::EmptyMessage => StatusCode::BAD_REQUEST,
            Self::MarketNotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
