//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No valid user identity on the request
    NotAuthenticated,
    /// Resource not found, or not owned by the caller
    NotFound,
    /// Point balance lower than the price
    InsufficientFunds,
    /// Permanent item already held by the user
    AlreadyOwned,
    /// Validation error with message
    Validation(String),
    /// Database/network failure, safe to retry on read paths
    TransientStore(String),
    /// Stored data breaking an invariant
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    /// Whether a read that failed with this error may be attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::TransientStore(_))
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::NotAuthenticated => write!(f, "User not authenticated"),
            DomainError::NotFound => write!(f, "Resource not found"),
            DomainError::InsufficientFunds => write!(f, "Insufficient points"),
            DomainError::AlreadyOwned => write!(f, "Item already purchased"),
            DomainError::Validation(msg) => write!(f, "Validation error: {}", msg),
            DomainError::TransientStore(msg) => write!(f, "Database error: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        match e {
            sea_orm::DbErr::RecordNotFound(_) => DomainError::NotFound,
            other => DomainError::TransientStore(other.to_string()),
        }
    }
}
