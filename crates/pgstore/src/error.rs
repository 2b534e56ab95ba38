//! Error types for pgstore

use crate::classify::{ErrorKind, IntegrityKind, classify_code};
use thiserror::Error;

/// Result type alias for pgstore operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for statement compilation, schema reconciliation and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Invalid configuration (config file, registry setup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A field could not be mapped onto a column type
    #[error("Unresolved column type for '{entity}.{field}': {message}")]
    UnresolvedType {
        entity: String,
        field: String,
        message: String,
    },

    /// A filter used an operator with no registered renderer
    #[error("Unsupported filter operator '{operator}' on field '{field}'")]
    UnsupportedOperator { operator: String, field: String },

    /// A filter value does not fit its operator
    #[error("Invalid value for operator '{operator}' on field '{field}': {message}")]
    InvalidFilterValue {
        operator: String,
        field: String,
        message: String,
    },

    /// The field set is missing or empty for the requested operation
    #[error("Invalid field set: {0}")]
    InvalidFieldSet(String),

    /// Wrong number or shape of models for the requested operation
    #[error("Invalid models: {0}")]
    InvalidModels(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Classified error reported by the server
    #[error("Database error ({kind}) [{code}]: {message}")]
    Database {
        kind: ErrorKind,
        code: String,
        message: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Client-side driver error
    #[error("Query error: {0}")]
    Query(#[source] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_field_set(message: impl Into<String>) -> Self {
        Self::InvalidFieldSet(message.into())
    }

    pub fn invalid_models(message: impl Into<String>) -> Self {
        Self::InvalidModels(message.into())
    }

    pub fn unresolved_type(
        entity: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnresolvedType {
            entity: entity.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Canonical kind of this error.
    ///
    /// Compilation and input errors are reported as [`ErrorKind::Internal`] /
    /// [`ErrorKind::FieldValueInvalid`]; backend errors carry their classified kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database { kind, .. } => *kind,
            Self::Query(err) => crate::classify::classify_error(err),
            Self::Connection(_) => ErrorKind::ConnectionFailure,
            Self::NotFound(_) => ErrorKind::NoResult,
            Self::InvalidFilterValue { .. } | Self::Decode { .. } => ErrorKind::FieldValueInvalid,
            #[cfg(feature = "pool")]
            Self::Pool(_) => ErrorKind::ConnectionFailure,
            _ => ErrorKind::Internal,
        }
    }

    /// SQLSTATE code reported by the server, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Database { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        self.kind() == ErrorKind::IntegrityViolation(IntegrityKind::Unique)
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        self.kind() == ErrorKind::IntegrityViolation(IntegrityKind::ForeignKey)
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the server signalled the failed operation as safe to repeat.
    pub fn is_retryable(&self) -> bool {
        self.code().is_some_and(ErrorKind::is_retryable_code)
    }

    /// Parse a tokio_postgres error into a classified OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code().code().to_string();
            let message = match db_err.constraint() {
                Some(constraint) => format!("{}: {}", constraint, db_err.message()),
                None => db_err.message().to_string(),
            };
            return Self::Database {
                kind: classify_code(&code),
                code,
                message,
                source: err,
            };
        }
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Query(err)
    }
}

impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::from_db_error(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_report_their_kind() {
        let err = OrmError::InvalidFilterValue {
            operator: "contains".into(),
            field: "name".into(),
            message: "expected text".into(),
        };
        assert_eq!(err.kind(), ErrorKind::FieldValueInvalid);
        assert_eq!(OrmError::not_found("x").kind(), ErrorKind::NoResult);
        assert_eq!(
            OrmError::invalid_field_set("empty").kind(),
            ErrorKind::Internal
        );
        assert!(!OrmError::validation("x").is_retryable());
    }

    #[test]
    fn messages_carry_context() {
        let err = OrmError::unresolved_type("User", "avatar", "no column type");
        assert_eq!(
            err.to_string(),
            "Unresolved column type for 'User.avatar': no column type"
        );
        let err = OrmError::UnsupportedOperator {
            operator: "near".into(),
            field: "location".into(),
        };
        assert!(err.to_string().contains("near"));
        assert!(err.to_string().contains("location"));
    }
}
