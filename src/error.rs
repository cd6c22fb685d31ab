//! Error types for the account service
//!
//! Provides unified error handling using thiserror.

use std::fmt;

use thiserror::Error;

// == Error Kind ==
/// Fieldless classification of a [`ServiceError`].
///
/// Callers map these to their own presentation (for example an HTTP
/// handler turning `NotFound` into 404 and the validation kinds into 400).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingData,
    InvalidEmail,
    DuplicateUsername,
    InvalidInput,
    NotFound,
    StoreUnavailable,
}

// == Service Error Enum ==
/// Unified error type for every record service operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Input record absent or missing a required field
    #[error("Missing data: {0}")]
    MissingData(String),

    /// Email failed format validation
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Another current record already uses the username
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    /// Malformed or absent identity, or an unusable field value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No record with the requested identity or username
    #[error("Not found: {0}")]
    NotFound(String),

    /// Propagated verbatim from the record store
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl ServiceError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::MissingData(_) => ErrorKind::MissingData,
            ServiceError::InvalidEmail(_) => ErrorKind::InvalidEmail,
            ServiceError::DuplicateUsername(_) => ErrorKind::DuplicateUsername,
            ServiceError::InvalidInput(_) => ErrorKind::InvalidInput,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    /// True for failures detected before any mutation was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingData
                | ErrorKind::InvalidEmail
                | ErrorKind::DuplicateUsername
                | ErrorKind::InvalidInput
        )
    }
}

// == Store Error Enum ==
/// Unique index on the record store that rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Id,
    Username,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Id => f.write_str("id"),
            UniqueField::Username => f.write_str("username"),
        }
    }
}

/// Failures reported by a [`RecordStore`](crate::store::RecordStore).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Write violated a unique index
    #[error("Unique constraint violated on {field}: {value}")]
    Conflict { field: UniqueField, value: String },
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
            StoreError::Conflict {
                field: UniqueField::Username,
                value,
            } => ServiceError::DuplicateUsername(value),
            StoreError::Conflict {
                field: UniqueField::Id,
                value,
            } => ServiceError::InvalidInput(format!("identity {} is already in use", value)),
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the account service.
pub type Result<T> = std::result::Result<T, ServiceError>;
