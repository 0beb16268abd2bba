//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Mercantil                              │
//! │                                                                         │
//! │  Handler → Result<T, ApiError>                                          │
//! │                                                                         │
//! │  FieldErrors ─────────────────┐                                         │
//! │  CoreError::InsufficientStock ┼──► 422 { code, message, errors }        │
//! │  CoreError::AmountOverflow ───┘                                         │
//! │  filter token ────────────────────► 400 { code, message }               │
//! │  bearer token ────────────────────► 401 { code, message }               │
//! │  DbError::NotFound ───────────────► 404 { code, message }               │
//! │  anything else ───────────────────► 500 { code, message, details? }     │
//! │                                        │                                │
//! │                                        └─ tracing::error! with detail   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `details` only reaches the client when the server runs with
//! `API_EXPOSE_ERROR_DETAILS=true`; see [`attach_error_details`].

use std::collections::BTreeMap;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mercantil_core::{CoreError, FieldErrors, ValidationError};
use mercantil_db::{DbError, SaleError};
use serde::Serialize;

use crate::AppState;

/// API error returned from handlers.
///
/// ## Serialization
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "The given data was invalid",
///   "errors": { "lines.0.quantity": ["lines.0.quantity must be positive"] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,

    /// Messages per field path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,

    /// Operator diagnostics, stripped unless exposure is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed request body (400)
    BadRequest,

    /// Path token outside its allow-list (400)
    InvalidFilter,

    /// Missing or invalid bearer token (401)
    Unauthorized,

    /// Resource not found (404)
    NotFound,

    /// Input validation failed (422)
    ValidationError,

    /// Requested quantity exceeds stock (422)
    InsufficientStock,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest | ErrorCode::InvalidFilter => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationError | ErrorCode::InsufficientStock => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            errors: None,
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BadRequest, message)
    }

    /// Creates an error for a rejected path token.
    pub fn invalid_filter(err: ValidationError) -> Self {
        ApiError::new(ErrorCode::InvalidFilter, err.to_string())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates an internal error carrying operator diagnostics.
    pub fn internal(code: ErrorCode, message: impl Into<String>, details: impl Into<String>) -> Self {
        let details = details.into();
        tracing::error!(code = ?code, details = %details, "Request failed unexpectedly");
        ApiError {
            details: Some(details),
            ..ApiError::new(code, message)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    fn public(&self) -> ApiError {
        ApiError {
            details: None,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from(FieldErrors::from(err))
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError {
            errors: Some(errors.by_field()),
            ..ApiError::new(ErrorCode::ValidationError, "The given data was invalid")
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock { .. } => {
                let message = err.to_string();
                let errors = err
                    .field()
                    .map(|field| BTreeMap::from([(field, vec![message.clone()])]));
                ApiError {
                    errors,
                    ..ApiError::new(ErrorCode::InsufficientStock, message)
                }
            }
            CoreError::AmountOverflow(_) => ApiError::new(ErrorCode::ValidationError, err.to_string()),
            CoreError::Validation(errors) => ApiError::from(errors),
        }
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::Busy => {
                ApiError::internal(ErrorCode::DatabaseError, "Database is busy", err.to_string())
            }
            other => ApiError::internal(
                ErrorCode::DatabaseError,
                "Database operation failed",
                other.to_string(),
            ),
        }
    }
}

impl From<SaleError> for ApiError {
    fn from(err: SaleError) -> Self {
        match err {
            SaleError::Rejected(core) => ApiError::from(core),
            SaleError::Database(db) => ApiError::from(db),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self.public())).into_response();
        if self.details.is_some() {
            response.extensions_mut().insert(self);
        }
        response
    }
}

/// Re-renders error responses with their `details` when the server is
/// configured to expose them.
pub async fn attach_error_details(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if !state.expose_error_details {
        return response;
    }
    match response.extensions_mut().remove::<ApiError>() {
        Some(error) => (error.status(), Json(error)).into_response(),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::not_found("Sale", "VT0001").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(DbError::Internal("boom".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_field_errors_grouped_by_path() {
        let mut errors = FieldErrors::new();
        errors.push(ValidationError::Required {
            field: "client_id".to_string(),
        });
        errors.push(ValidationError::MustBePositive {
            field: "lines.1.quantity".to_string(),
        });

        let api = ApiError::from(errors);
        assert_eq!(api.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let grouped = api.errors.unwrap();
        assert!(grouped.contains_key("client_id"));
        assert!(grouped.contains_key("lines.1.quantity"));
    }

    #[test]
    fn test_insufficient_stock_tags_line() {
        let api = ApiError::from(SaleError::Rejected(CoreError::InsufficientStock {
            product_id: "PR0002".to_string(),
            line: 1,
            available: 3,
            requested: 5,
        }));

        assert_eq!(api.code, ErrorCode::InsufficientStock);
        assert_eq!(api.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.message.contains("PR0002"));
        assert!(api.errors.unwrap().contains_key("lines.1.product_id"));
    }

    #[test]
    fn test_not_found_from_db() {
        let api = ApiError::from(DbError::not_found("Sale", "VT0009"));
        assert_eq!(api.code, ErrorCode::NotFound);
        assert_eq!(api.message, "Sale not found: VT0009");
    }

    #[test]
    fn test_busy_database_message() {
        let api = ApiError::from(SaleError::Database(DbError::Busy));
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert_eq!(api.message, "Database is busy");
    }

    #[test]
    fn test_details_hidden_from_body() {
        let api = ApiError::from(DbError::QueryFailed("no such table: sales".to_string()));
        assert_eq!(api.details.as_deref(), Some("Query failed: no such table: sales"));

        let body = serde_json::to_value(api.public()).unwrap();
        assert!(body.get("details").is_none());
        assert_eq!(body["code"], "DATABASE_ERROR");
    }
}
