//! API error taxonomy for the PickVault backend
//!
//! Every failure surfaced over HTTP maps to one of these variants. Validation
//! errors carry field details; everything else returns a single message plus a
//! machine-readable code, with internals logged but never leaked.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<String>,
    },

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message}")]
    Conflict {
        message: String,
        code: &'static str,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn already_processed() -> Self {
        Self::Conflict {
            message: "Request has already been processed".to_string(),
            code: "ALREADY_PROCESSED",
        }
    }

    pub fn already_submitted() -> Self {
        Self::Conflict {
            message: "A code has already been submitted for this stage".to_string(),
            code: "ALREADY_SUBMITTED",
        }
    }

    pub fn conflict(message: impl Into<String>, code: &'static str) -> Self {
        Self::Conflict {
            message: message.into(),
            code,
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();

        Self::Validation {
            message: "Validation failed".to_string(),
            errors: details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { message, errors } => (
                StatusCode::BAD_REQUEST,
                json!({ "message": message, "errors": errors }),
            ),
            ApiError::Auth(message) => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": message, "error": "AUTH" }),
            ),
            ApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                json!({ "message": message, "error": "FORBIDDEN" }),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "message": format!("{} not found", what), "error": "NOT_FOUND" }),
            ),
            ApiError::Conflict { message, code } => (
                StatusCode::BAD_REQUEST,
                json!({ "message": message, "error": code }),
            ),
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error", "error": "INTERNAL" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_processed_carries_machine_code() {
        match ApiError::already_processed() {
            ApiError::Conflict { code, .. } => assert_eq!(code, "ALREADY_PROCESSED"),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn validation_errors_flatten_field_messages() {
        use validator::Validate;

        #[derive(Validate)]
        struct Payload {
            #[validate(length(min = 1, message = "must not be empty"))]
            email: String,
        }

        let payload = Payload {
            email: String::new(),
        };
        let err: ApiError = payload.validate().unwrap_err().into();
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].starts_with("email:"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
