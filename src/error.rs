// API error taxonomy and its mapping onto HTTP responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::auth::AuthError;
use crate::schema::FieldError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Structural or enumeration mismatch in a request body.
    #[error("Invalid player data")]
    Validation(Vec<FieldError>),
    #[error("Player name already exists")]
    Conflict,
    #[error("Player not found")]
    NotFound,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("Too many login attempts, try again later")]
    TooManyRequests,
    #[error("{context}: {cause}")]
    Internal {
        /// Client-facing message, e.g. "Failed to create player".
        context: &'static str,
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApiError {
    pub fn internal(
        context: &'static str,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ApiError::Internal {
            context,
            cause: cause.into(),
        }
    }

    /// Map a store failure, using `context` as the client message for
    /// anything unexpected.
    pub fn from_store(context: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::NameTaken => ApiError::Conflict,
            other => ApiError::internal(context, other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(vec![FieldError::new(&[], rejection.body_text())])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => json!({ "message": self.to_string(), "errors": errors }),
            ApiError::Internal { context, cause } => {
                tracing::error!("{context}: {cause}");
                json!({ "message": context })
            }
            other => json!({ "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Failures while assembling the application at startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to open player store: {0}")]
    Store(#[from] StoreError),
    #[error("failed to initialize admin auth: {0}")]
    Auth(#[from] AuthError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}
