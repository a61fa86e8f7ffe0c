use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;

pub type AppResult<T> = Result<T, AppError>;

/// Every outcome an inventory operation can report besides success.
/// `NotFound` and `InsufficientStock` are expected business results, not defects.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i64,
        available: i64,
    },

    /// Outcome unknown to the caller; a decrement reported this way may or may not have applied.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::NotFound(_) => "not_found",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Unreadable or mistyped request bodies are caller errors like any other.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidArgument(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::StoreUnavailable(e) => warn!(error = %e, "Store unavailable"),
            AppError::Internal(e) => error!(error = %e, "Internal error"),
            _ => {}
        }

        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let AppError::InsufficientStock {
            requested,
            available,
            ..
        } = &self
        {
            body["requested"] = json!(requested);
            body["available"] = json!(available);
        }

        (status, Json(body)).into_response()
    }
}
