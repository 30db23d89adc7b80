//! Response envelope shared by every endpoint

use crate::core::query::Pagination;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// `{ data, message, pagination? }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 response
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            pagination: None,
            status: StatusCode::OK,
        }
    }

    /// 201 response
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data, message)
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let response = ApiResponse::ok(json!([1, 2]), "Posts List")
            .with_pagination(Pagination::new(1, 10, 2));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["message"], json!("Posts List"));
        assert_eq!(value["pagination"]["total"], json!(2));
        assert!(value.get("status").is_none());
    }

    #[test]
    fn test_pagination_is_omitted_when_absent() {
        let response = ApiResponse::created(json!({ "id": 1 }), "Post has been created");
        assert_eq!(response.status(), StatusCode::CREATED);
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("pagination").is_none());
    }
}
