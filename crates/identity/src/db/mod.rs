//! Typed access to the identity collections.
//!
//! Repositories turn raw directory records into domain objects and back.
//! They run with the directory client's session as the requester, so every
//! call is subject to the directory's row-scoped policies.
//!
//! ## Collections
//!
//! - `user_profiles` - [`ProfileRepository`]
//! - `admin_users` - [`AdminGrantRepository`]
//! - `waitlist_users` - [`WaitlistRepository`]

pub mod admin_grants;
pub mod profiles;
pub mod waitlist;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::directory::{DirectoryError, Record};

pub use admin_grants::AdminGrantRepository;
pub use profiles::ProfileRepository;
pub use waitlist::WaitlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Error from the Account Directory.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A record in the directory is malformed.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested record was not found.
    #[error("not found")]
    NotFound,
}

/// Deserialize a raw record into a row type.
fn decode<T: DeserializeOwned>(table: &str, record: Record) -> Result<T, RepositoryError> {
    serde_json::from_value(serde_json::Value::Object(record))
        .map_err(|e| RepositoryError::DataCorruption(format!("malformed {table} record: {e}")))
}

/// Build a single-column patch.
fn patch(column: &str, value: impl Into<serde_json::Value>) -> Record {
    let mut record = Record::new();
    record.insert(column.to_owned(), value.into());
    record
}
