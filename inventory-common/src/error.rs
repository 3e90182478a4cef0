//! Common error types for the inventory services

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for inventory operations
pub type Result<T> = std::result::Result<T, Error>;

/// One rejected field in a request or import batch
///
/// `index` is the position of the offending import record, or -1 when the
/// violation is not tied to a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub index: i64,
    pub field_path: String,
    pub message: String,
}

impl Violation {
    pub fn new(index: i64, field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index,
            field_path: field_path.into(),
            message: message.into(),
        }
    }

    /// Violation not attached to any single record
    pub fn batch(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(-1, field_path, message)
    }
}

/// Error kinds shared by the store, the validator and the import pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single structural or business rule violation
    #[error("{message}")]
    InvalidInput { field: String, message: String },

    /// Every structural violation found in a request
    #[error("Validation failed ({} violations)", .0.len())]
    Validation(Vec<Violation>),

    /// Same product business key repeated within one import batch
    #[error("Duplicate in batch: {0}")]
    InBatchConflict(String),

    /// Business key already present in the store
    #[error("Already exists: {0}")]
    ExistingRecordConflict(String),

    /// Entity still referenced by other rows
    #[error("Referenced elsewhere: {0}")]
    ReferentialConflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Classify a store error raised by a write
    ///
    /// Unique violations become [`Error::ExistingRecordConflict`], foreign-key
    /// violations become [`Error::ReferentialConflict`] carrying `on_reference`.
    /// Everything else stays a store failure.
    pub fn from_write(err: sqlx::Error, on_reference: impl FnOnce() -> String) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Error::ExistingRecordConflict(
                    "An object with this unique value already exists".to_string(),
                );
            }
            if db_err.is_foreign_key_violation() {
                return Error::ReferentialConflict(on_reference());
            }
        }
        Error::Database(err)
    }

    /// Persistence or internal failure, as opposed to a rejection of the input
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::InBatchConflict(_) | Error::ExistingRecordConflict(_) | Error::ReferentialConflict(_)
        )
    }

    /// Rejection entries for this error, attributed to record `index`
    ///
    /// Field paths are rooted at `items[index]` for record-level errors and at
    /// `items` for batch-level ones (`index` of -1).
    pub fn violations(&self, index: i64) -> Vec<Violation> {
        let root = if index >= 0 {
            format!("items[{}]", index)
        } else {
            "items".to_string()
        };
        match self {
            Error::Validation(list) => list.clone(),
            Error::InvalidInput { field, message } => {
                vec![Violation::new(index, format!("{}.{}", root, field), message.clone())]
            }
            Error::InBatchConflict(msg)
            | Error::ExistingRecordConflict(msg)
            | Error::ReferentialConflict(msg)
            | Error::NotFound(msg) => vec![Violation::new(index, root, msg.clone())],
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                vec![Violation::new(
                    index,
                    "items",
                    "Internal server error. Transaction may have been rolled back.",
                )]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_serializes_camel_case() {
        let v = Violation::new(2, "items[2].price", "must be > 0");
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["index"], 2);
        assert_eq!(json["fieldPath"], "items[2].price");
        assert_eq!(json["message"], "must be > 0");
    }

    #[test]
    fn test_batch_violation_has_negative_index() {
        assert_eq!(Violation::batch("file", "Invalid JSON").index, -1);
    }

    #[test]
    fn test_store_failure_does_not_leak_detail() {
        let err = Error::Internal("connection string secret=abc".to_string());
        let v = err.violations(-1);
        assert_eq!(v.len(), 1);
        assert!(!v[0].message.contains("secret"));
    }

    #[test]
    fn test_record_violation_paths_are_rooted_at_item() {
        let err = Error::invalid("manufacturer.rating", "manufacturer.rating > 0 required");
        let v = err.violations(3);
        assert_eq!(v[0].index, 3);
        assert_eq!(v[0].field_path, "items[3].manufacturer.rating");
        assert_eq!(err.to_string(), "manufacturer.rating > 0 required");

        let conflict = Error::InBatchConflict("dup".to_string()).violations(1);
        assert_eq!(conflict[0].field_path, "items[1]");
    }

    #[test]
    fn test_non_database_write_error_stays_store_failure() {
        let err = Error::from_write(sqlx::Error::RowNotFound, || "unused".to_string());
        assert!(matches!(err, Error::Database(sqlx::Error::RowNotFound)));
    }
}
