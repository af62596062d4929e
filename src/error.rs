use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::{Map, Value, json};

use crate::models::QueryError;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    ServiceUnavailable,
    NotFound(String),
    /// Validation errors keyed by parameter, sent back as `{"errors": {..}}`
    Unprocessable(Map<String, Value>),
    InternalError(String),
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError::Unprocessable(err.errors())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            AppError::Unprocessable(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            AppError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_unavailable_response() {
        let error = AppError::ServiceUnavailable;
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Service unavailable");
    }

    #[tokio::test]
    async fn not_found_response() {
        let error = AppError::NotFound("table not found: books".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"table not found: books");
    }

    #[tokio::test]
    async fn unprocessable_response() {
        let error = AppError::from(QueryError::UnsupportedMatchMode {
            field: "age".into(),
            mode: "between".into(),
        });
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json!({ "errors": { "filters.age": "unsupported match mode: between" } }),
            body
        );
    }

    #[tokio::test]
    async fn internal_error_response() {
        let error = AppError::InternalError("Something went wrong".to_string());
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Something went wrong");
    }
}
