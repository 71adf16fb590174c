//! HTTP error responses.
//!
//! Every failure is rendered as `{"message": ..., "errorCode": ...}`.
//! Domain failures take their status from [`HttpErrorMapping`] and expose
//! only their public message.

use crate::core::error::{GuardError, HttpErrorMapping};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Failure while handling a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The user id header is absent.
    #[error("{header} header is required")]
    MissingHeader { header: String },

    /// The user id header is present but unusable.
    #[error("Unauthorized")]
    Unauthorized,

    /// A path or body value failed validation.
    #[error("{0}")]
    Validation(String),

    /// The guard operation failed.
    #[error(transparent)]
    Guard(#[from] GuardError),
}

impl ApiError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingHeader { .. } => "MISSING_HEADER",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Guard(e) => e.code(),
        }
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingHeader { .. } | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Guard(e) => StatusCode::from_u16(HttpErrorMapping::to_status(e))
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Guard(e) => e.public_message().to_string(),
            other => other.to_string(),
        }
    }
}

/// Error body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub error_code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message(),
            error_code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}
