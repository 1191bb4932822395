//! Error types for the token service and its HTTP surface.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use warrant_core::{InvalidPermission, Permission};
use warrant_jwt::CodecError;
use warrant_store::StoreError;

/// Typed outcomes of the four token service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The principal name was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// The permission literal is not one of the known levels.
    #[error(transparent)]
    InvalidPermission(#[from] InvalidPermission),

    /// No record exists for the token being removed.
    #[error("token not found")]
    NotFound,

    /// The presented token is not a live credential.
    #[error("unknown token")]
    UnknownToken,

    /// The credential is live but its permission is too low.
    #[error("permission '{have}' does not cover '{want}'")]
    Unauthorized { have: Permission, want: Permission },

    /// Two freshly encoded tokens in a row already existed in the store.
    #[error("token collision persisted after retry; nonce source is broken")]
    Collision,

    /// The codec failed to produce a token.
    #[error("failed to encode token: {0}")]
    Encoding(#[from] CodecError),

    /// The credential store failed.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The request could not be parsed.
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Build a JSON error body of the form `{"error": code, "message": text}`.
pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::BadRequest(msg) => {
                return json_error(StatusCode::BAD_REQUEST, "bad_request", msg);
            }
            ApiError::Service(err) => err,
        };

        let message = err.to_string();
        match err {
            ServiceError::EmptyName => json_error(StatusCode::BAD_REQUEST, "empty_name", message),
            ServiceError::InvalidPermission(_) => {
                json_error(StatusCode::BAD_REQUEST, "invalid_permission", message)
            }
            ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
            ServiceError::UnknownToken => {
                json_error(StatusCode::UNAUTHORIZED, "unknown_token", message)
            }
            ServiceError::Unauthorized { .. } => {
                json_error(StatusCode::FORBIDDEN, "insufficient_permission", message)
            }
            ServiceError::Collision => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "collision", message)
            }
            ServiceError::Encoding(_) => {
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "encoding_error", message)
            }
            ServiceError::Store(e) => {
                tracing::error!(error = %e, "Credential store failure");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
            }
        }
    }
}
