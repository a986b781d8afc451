//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Ledger rule (CoreError)             │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError (this module) ◄─────────────────┘ (passed through unchanged)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Caller decides: show message, retry, or abort                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use stockroom_core::CoreError;
use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and ledger rule violations, and provide
/// additional context for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// A ledger rule rejected the operation before anything was committed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate SKU
    /// - Two writers issuing the same invoice number
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a non-existent product_id
    /// - Deleting a product that sale items still point at
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (e.g. stock would go negative).
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    /// A guarded update found the row changed since it was read.
    ///
    /// ## When This Occurs
    /// - Two payments applied to the same sale at once
    /// - A stock correction racing another movement
    #[error("{entity} {id} was modified concurrently, retry the operation")]
    ConcurrentModification { entity: String, id: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored JSON could not be encoded or decoded.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a ConcurrentModification error.
    pub fn concurrent(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::ConcurrentModification {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether this is a UNIQUE violation on a column whose name contains
    /// `column` (e.g. `"invoice_number"` matches `sales.invoice_number`).
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field, .. } if field.contains(column))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

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
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_pass_through_unchanged() {
        let err: DbError = CoreError::EmptySale.into();
        assert_eq!(err.to_string(), CoreError::EmptySale.to_string());
        assert!(matches!(err, DbError::Core(CoreError::EmptySale)));
    }

    #[test]
    fn test_unique_violation_on_column() {
        let err = DbError::duplicate("sales.invoice_number", "INV-2026-0001");
        assert!(err.is_unique_violation_on("invoice_number"));
        assert!(!err.is_unique_violation_on("sku"));
        assert!(!DbError::PoolExhausted.is_unique_violation_on("invoice_number"));
    }
}
