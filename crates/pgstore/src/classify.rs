//! Mapping of PostgreSQL SQLSTATE codes onto a backend-agnostic error taxonomy.
//!
//! Lookup first tries the exact five-character code, then falls back to the
//! two-character class prefix. Codes that match neither are [`ErrorKind::Unclassified`];
//! classification itself never fails.

use std::fmt;

/// Sub-kind of an integrity constraint violation (SQLSTATE class `23`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrityKind {
    /// Generic `23000` or any other class-23 code.
    General,
    /// `23001` restrict_violation.
    Restrict,
    /// `23502` not_null_violation.
    NotNull,
    /// `23503` foreign_key_violation.
    ForeignKey,
    /// `23505` unique_violation.
    Unique,
    /// `23514` check_violation.
    Check,
}

/// Canonical error kind derived from a backend error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoResult,
    ConnectionFailure,
    TransactionState,
    Internal,
    FieldValueInvalid,
    IntegrityViolation(IntegrityKind),
    AuthorizationFailure,
    ReservedNameConflict,
    DataTypeViolation,
    ResourceExhausted,
    Unclassified,
}

impl ErrorKind {
    /// Whether the backend signalled that repeating the operation may succeed.
    ///
    /// Only transient concurrency failures qualify: `40001` serialization_failure
    /// and `40P01` deadlock_detected.
    pub fn is_retryable_code(code: &str) -> bool {
        matches!(code, "40001" | "40P01")
    }

    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation(_))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoResult => "no result",
            Self::ConnectionFailure => "connection failure",
            Self::TransactionState => "invalid transaction state",
            Self::Internal => "internal",
            Self::FieldValueInvalid => "invalid field value",
            Self::IntegrityViolation(IntegrityKind::General) => "integrity violation",
            Self::IntegrityViolation(IntegrityKind::Restrict) => "restrict violation",
            Self::IntegrityViolation(IntegrityKind::NotNull) => "not null violation",
            Self::IntegrityViolation(IntegrityKind::ForeignKey) => "foreign key violation",
            Self::IntegrityViolation(IntegrityKind::Unique) => "unique violation",
            Self::IntegrityViolation(IntegrityKind::Check) => "check violation",
            Self::AuthorizationFailure => "authorization failure",
            Self::ReservedNameConflict => "reserved name conflict",
            Self::DataTypeViolation => "data type violation",
            Self::ResourceExhausted => "resource exhausted",
            Self::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

fn exact(code: &str) -> Option<ErrorKind> {
    use ErrorKind::*;
    let kind = match code {
        "P0002" => NoResult,
        "0B000" => TransactionState,
        "23000" => IntegrityViolation(IntegrityKind::General),
        "23001" => IntegrityViolation(IntegrityKind::Restrict),
        "23502" => IntegrityViolation(IntegrityKind::NotNull),
        "23503" => IntegrityViolation(IntegrityKind::ForeignKey),
        "23505" => IntegrityViolation(IntegrityKind::Unique),
        "23514" => IntegrityViolation(IntegrityKind::Check),
        "28000" | "28P01" => AuthorizationFailure,
        "2D000" => TransactionState,
        "3F000" => Internal,
        "42939" => ReservedNameConflict,
        "42804" => DataTypeViolation,
        "42703" | "42883" | "42P01" | "42701" | "42P06" | "42P07" => Internal,
        "42501" => AuthorizationFailure,
        _ => return None,
    };
    Some(kind)
}

fn class(prefix: &str) -> Option<ErrorKind> {
    use ErrorKind::*;
    let kind = match prefix {
        "02" => NoResult,
        "08" => ConnectionFailure,
        "21" => Internal,
        "22" => FieldValueInvalid,
        "23" => IntegrityViolation(IntegrityKind::General),
        "25" | "40" => TransactionState,
        "3D" | "3F" | "42" => Internal,
        "53" | "54" => ResourceExhausted,
        "58" | "XX" => Internal,
        _ => return None,
    };
    Some(kind)
}

/// Classify a raw SQLSTATE code.
pub fn classify_code(code: &str) -> ErrorKind {
    if let Some(kind) = exact(code) {
        return kind;
    }
    code.get(0..2)
        .and_then(class)
        .unwrap_or(ErrorKind::Unclassified)
}

/// Classify a driver error.
///
/// Server-reported errors go through [`classify_code`]; a closed connection is a
/// connection failure and every other client-side error is internal.
pub fn classify_error(err: &tokio_postgres::Error) -> ErrorKind {
    if let Some(db_err) = err.as_db_error() {
        return classify_code(db_err.code().code());
    }
    if err.is_closed() {
        return ErrorKind::ConnectionFailure;
    }
    ErrorKind::Internal
}
