//! Identity error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::directory::DirectoryError;

/// Errors returned by identity and session operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The caller lacks the role the operation requires.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No record for the given ID and role.
    #[error("not found")]
    NotFound,

    /// Malformed input, rejected before any directory call.
    #[error("{0}")]
    Invalid(String),

    /// The Account Directory could not be reached.
    #[error("account directory unavailable")]
    DirectoryUnavailable,

    /// The directory refused the request.
    #[error("{0}")]
    Rejected(String),
}

impl IdentityError {
    pub(crate) fn admin_required(operation: &str) -> Self {
        Self::Unauthorized(format!("{operation} requires the admin role"))
    }

    pub(crate) fn signed_out() -> Self {
        Self::Unauthorized("not signed in".to_string())
    }
}

impl From<DirectoryError> for IdentityError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unavailable => Self::DirectoryUnavailable,
            DirectoryError::NotFound => Self::NotFound,
            DirectoryError::NotAuthenticated => Self::signed_out(),
            DirectoryError::Forbidden(table) => {
                Self::Unauthorized(format!("permission denied for {table}"))
            }
            DirectoryError::InvalidCredentials => {
                Self::Rejected("Invalid login credentials".to_string())
            }
            DirectoryError::AlreadyRegistered => {
                Self::Rejected("User already registered".to_string())
            }
            DirectoryError::Rejected(message) => Self::Rejected(message),
        }
    }
}

impl From<RepositoryError> for IdentityError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Directory(e) => e.into(),
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::DataCorruption(message) => {
                Self::Rejected(format!("data corruption: {message}"))
            }
        }
    }
}
