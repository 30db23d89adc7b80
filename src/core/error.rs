//! Typed error handling for the request pipeline
//!
//! [`ApiError`] is what every handler returns on failure. It maps to an HTTP
//! status and renders the same `{ data, message }` envelope as successful
//! responses, so clients parse a single shape.
//!
//! # Error Categories
//!
//! - client errors (400, 405): bad verb, body, query or failed validation
//! - [`ApiError::Forbidden`]: the principal lacks the operation
//! - [`ApiError::NotFound`]: absent records, and records the principal does
//!   not own
//! - [`ApiError::UnknownResource`] and [`ApiError::Internal`]: wiring or
//!   storage failures, reported with a generic message

use crate::core::permission::Operation;
use crate::core::principal::RoleError;
use crate::core::query::QueryError;
use crate::core::record::RecordError;
use crate::core::store::StoreError;
use crate::core::validation::ValidationErrors;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Invalid request body")]
    InvalidBody(String),

    #[error("Validation failed")]
    Validation(ValidationErrors),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("{0}")]
    BadRequest(String),

    #[error("User is not allowed to {operation} this resource")]
    Forbidden { operation: Operation },

    #[error("Instance not found")]
    NotFound,

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InvalidBody(_)
            | ApiError::Validation(_)
            | ApiError::InvalidQuery(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::UnknownResource(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Payload placed in the `data` slot of the envelope
    fn data(&self) -> Value {
        match self {
            ApiError::Validation(errors) => json!(errors),
            ApiError::InvalidBody(reason) => json!({ "reason": reason }),
            _ => Value::Null,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::UniqueViolation { field, .. } => ApiError::Validation(
                ValidationErrors::single(field.clone(), format!("{} is already taken", field)),
            ),
            StoreError::Backend(message) => ApiError::Internal(message),
        }
    }
}

impl From<RecordError> for ApiError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Decode { message, .. } => ApiError::InvalidBody(message),
            RecordError::NotAnObject => {
                ApiError::InvalidBody("record is not a JSON object".to_string())
            }
            RecordError::MissingId => ApiError::Internal("record has no identity".to_string()),
        }
    }
}

impl From<RoleError> for ApiError {
    fn from(err: RoleError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Internal(detail) => tracing::error!(detail = %detail, "internal error"),
            ApiError::UnknownResource(name) => {
                tracing::error!(resource = %name, "resource is not registered")
            }
            _ => {}
        }
        let body = json!({
            "data": self.data(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::MethodNotAllowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Forbidden { operation: Operation::Read }.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::UnknownResource("Ghost".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_forbidden_message_names_operation() {
        let err = ApiError::Forbidden { operation: Operation::Delete };
        assert_eq!(err.to_string(), "User is not allowed to delete this resource");
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = ApiError::Internal("connection refused on 10.0.0.3".into());
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(ApiError::from(StoreError::NotFound), ApiError::NotFound));
        let err = ApiError::from(StoreError::UniqueViolation {
            collection: "users".into(),
            field: "email".into(),
        });
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.get("email"), Some("email is already taken"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
