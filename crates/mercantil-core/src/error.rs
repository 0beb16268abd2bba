//! # Error Types
//!
//! Domain-specific error types for mercantil-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mercantil-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - One field failing one rule                     │
//! │  └── FieldErrors      - Every failing field of a request               │
//! │                                                                         │
//! │  mercantil-db errors (separate crate)                                  │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── SaleError        - CoreError | DbError from the sale workflow     │
//! │                                                                         │
//! │  API errors (apps/api)                                                 │
//! │  └── ApiError         - What HTTP clients see (422 / 500 / ...)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested quantity exceeds the product's current stock.
    ///
    /// ## User Workflow
    /// ```text
    /// POST /api/sales  lines[1] = { product_id: "PR0002", quantity: 5 }
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "PR0002", line: 1, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole transaction rolled back, 422 tagged with lines.1.product_id
    /// ```
    #[error(
        "Requested quantity for product {product_id} exceeds available stock: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: String,
        line: usize,
        available: i64,
        requested: i64,
    },

    /// Monetary arithmetic left the representable range.
    #[error("Amount overflow while computing {0}")]
    AmountOverflow(&'static str),

    /// Request failed validation on one or more fields.
    #[error("Validation failed: {0}")]
    Validation(#[from] FieldErrors),
}

impl CoreError {
    /// Field path this error should be reported under, if it is tied to one.
    pub fn field(&self) -> Option<String> {
        match self {
            CoreError::InsufficientStock { line, .. } => Some(format!("lines.{line}.product_id")),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Each variant describes one rule broken by one field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Referenced record does not exist.
    #[error("{field} references a record that does not exist: {value}")]
    NotFound { field: String, value: String },
}

impl ValidationError {
    /// Returns the name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::NotFound { field, .. } => field,
        }
    }
}

// =============================================================================
// Field Errors
// =============================================================================

/// Every validation failure of a request, in the order they were found.
///
/// Serialized by the API as `{ "lines.0.quantity": ["..."] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<ValidationError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        FieldErrors::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Groups messages by field path.
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            grouped
                .entry(error.field().to_string())
                .or_default()
                .push(error.to_string());
        }
        grouped
    }
}

impl From<ValidationError> for FieldErrors {
    fn from(error: ValidationError) -> Self {
        FieldErrors {
            errors: vec![error],
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for FieldErrors {}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: "PR0002".to_string(),
            line: 1,
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Requested quantity for product PR0002 exceeds available stock: available 3, requested 5"
        );
        assert_eq!(err.field().as_deref(), Some("lines.1.product_id"));
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "client_id".to_string(),
        };
        assert_eq!(err.to_string(), "client_id is required");
        assert_eq!(err.field(), "client_id");
    }

    #[test]
    fn test_field_errors_group_by_field() {
        let mut errors = FieldErrors::new();
        errors.push(ValidationError::MustBePositive {
            field: "lines.0.quantity".to_string(),
        });
        errors.push(ValidationError::Required {
            field: "lines.0.quantity".to_string(),
        });
        errors.push(ValidationError::Required {
            field: "client_id".to_string(),
        });

        let grouped = errors.by_field();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["lines.0.quantity"].len(), 2);
        assert_eq!(grouped["client_id"], vec!["client_id is required"]);
    }

    #[test]
    fn test_field_errors_convert_to_core_error() {
        let errors: FieldErrors = ValidationError::Required {
            field: "lines".to_string(),
        }
        .into();
        let core_err: CoreError = errors.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
