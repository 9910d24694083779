//! Request-level error type.
//!
//! Every handler returns `Result<_, ApiError>`; the error is rendered once, in
//! [`IntoResponse`], as a `{ sucesso: false, mensagem }` envelope.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::access::AccessDenied;
use shared::{EditorError, Envelope, ModelError};
use thiserror::Error;
use tracing::error;

use crate::mailer::MailError;
use crate::recovery::RecoveryError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Recovery(#[from] RecoveryError),
    #[error("{context}")]
    Internal {
        context: &'static str,
        cause: anyhow::Error,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Unprocessable(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(context: &'static str, cause: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            context,
            cause: cause.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Recovery(_) => StatusCode::BAD_REQUEST,
            Self::Unprocessable(_) | Self::Conflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal { context, cause } => {
                error!("{context}: {cause:#}");
                context.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(Envelope::failure(message))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Invalid data: {}", rejection.body_text()))
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        Self::Validation(format!("Invalid data: {err}"))
    }
}

impl From<EditorError> for ApiError {
    fn from(err: EditorError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self::Conflict(err.to_string()),
            other => Self::internal("Storage failure", other),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::internal("Failed to send recovery email", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unprocessable("x").status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AccessDenied::NotOwner).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(RecoveryError::Expired).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RecoveryError::Mismatch).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn conflicts_map_to_422() {
        let err = ApiError::from(StoreError::Conflict {
            field: "identifier",
            value: "RACK001".into(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("RACK001"));
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::internal("Storage failure", anyhow::anyhow!("disk on fire"));
        assert_eq!(err.to_string(), "Storage failure");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
