use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Failures surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("❌ {} {}", status, self);
        } else {
            log::warn!("⚠️ {} {}", status, self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// `/nutrition` keeps its own failure shape: `{success: false, error, details}`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct NutritionError {
    #[serde(skip)]
    pub status: StatusCode,
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl NutritionError {
    pub fn new(status: StatusCode, error: &str, details: Option<String>) -> Self {
        Self {
            status,
            success: false,
            error: error.to_string(),
            details,
        }
    }
}

impl IntoResponse for NutritionError {
    fn into_response(self) -> Response {
        log::error!("❌ Nutrition plan failed ({}): {} {:?}", self.status, self.error, self.details);
        (self.status, Json(self)).into_response()
    }
}
