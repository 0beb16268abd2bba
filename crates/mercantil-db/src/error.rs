//! # Database Error Types
//!
//! ```text
//! sqlx::Error ──► DbError ──┬──────────────────► SaleError::Database
//!                           │   CoreError ─────► SaleError::Rejected
//!                           ▼
//!                     ApiError (404 for NotFound, 500 otherwise)
//! ```
//!
//! A [`SaleError`] always means the sale transaction was rolled back.

use mercantil_core::{CoreError, FieldErrors};
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A sale, product or sequence that is not there, or that the caller
    /// may not see.
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// A `UNIQUE` or primary key collision, e.g. a sale line id that was
    /// already stored. `constraint` is the `table.column` SQLite reports.
    #[error("Duplicate value for {constraint}")]
    UniqueViolation {
        constraint: String,
    },

    /// A `FOREIGN KEY` or `CHECK` constraint refused the write.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Another writer held the database lock past the busy timeout, or no
    /// pooled connection became free in time.
    #[error("Database is busy")]
    Busy,

    /// The database file could not be opened.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// COMMIT failed; the transaction's writes are gone.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Anything else, including broken invariants in stored rows.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// SQLITE_BUSY and SQLITE_LOCKED, including their extended codes.
fn is_lock_contention(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

/// ```text
/// RowNotFound                          → NotFound
/// "UNIQUE constraint failed: t.c"      → UniqueViolation { constraint: "t.c" }
/// FOREIGN KEY / CHECK failures         → ConstraintViolation
/// SQLITE_BUSY / SQLITE_LOCKED          → Busy
/// PoolTimedOut                         → Busy
/// other database errors                → QueryFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if let Some(constraint) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        constraint: constraint.to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed")
                    || msg.contains("CHECK constraint failed")
                {
                    DbError::ConstraintViolation(msg.to_string())
                } else if is_lock_contention(db_err.code().as_deref()) {
                    DbError::Busy
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::Busy,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Sale Workflow Error
// =============================================================================

/// Failure of the sale creation workflow.
///
/// Either way the transaction has been rolled back and nothing was written.
#[derive(Debug, Error)]
pub enum SaleError {
    /// The request broke a business rule (missing client or product,
    /// insufficient stock, amount overflow).
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// The database failed underneath the workflow.
    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<sqlx::Error> for SaleError {
    fn from(err: sqlx::Error) -> Self {
        SaleError::Database(err.into())
    }
}

impl From<FieldErrors> for SaleError {
    fn from(errors: FieldErrors) -> Self {
        SaleError::Rejected(CoreError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_lock_contention_codes() {
        assert!(is_lock_contention(Some("5")));
        assert!(is_lock_contention(Some("517")));
        assert!(is_lock_contention(Some("6")));
        assert!(!is_lock_contention(Some("19")));
        assert!(!is_lock_contention(None));
    }

    #[test]
    fn test_sale_error_keeps_rule_violations_apart() {
        let err: SaleError = CoreError::AmountOverflow("total").into();
        assert!(matches!(err, SaleError::Rejected(_)));

        let err: SaleError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, SaleError::Database(DbError::Busy)));
    }
}
