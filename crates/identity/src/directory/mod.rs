//! Account Directory contract.
//!
//! The directory is the external record store and auth provider behind the
//! identity core: accounts, sessions, password flows, a push stream of
//! auth-state changes, and generic filtered CRUD over named record
//! collections. Access rules on those collections are enforced by the
//! directory itself, keyed on the requester's own ID and role.
//!
//! # Collections
//!
//! - `user_profiles` - one profile per account
//! - `admin_users` - admin grants, keyed by account ID
//! - `waitlist_users` - waitlist entries, keyed by account ID
//! - `demo_requests`, `contact_submissions`, `newsletter_subscribers` - form
//!   collections (insert-only for visitors)

pub mod memory;
mod query;

use std::future::Future;

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::broadcast;

use launchpad_core::{Email, UserId};

use crate::models::{AccountIdentity, AuthChange, Session};

pub use memory::{DirectoryClient, DirectorySnapshot, MemoryDirectory, Provision};
pub use query::{Order, TableQuery};

/// A raw record from a directory collection.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Collection names.
pub mod tables {
    pub const USER_PROFILES: &str = "user_profiles";
    pub const ADMIN_USERS: &str = "admin_users";
    pub const WAITLIST_USERS: &str = "waitlist_users";
    pub const DEMO_REQUESTS: &str = "demo_requests";
    pub const CONTACT_SUBMISSIONS: &str = "contact_submissions";
    pub const NEWSLETTER_SUBSCRIBERS: &str = "newsletter_subscribers";

    /// Collections keyed by the owning account's ID.
    pub const ACCOUNT_SCOPED: [&str; 3] = [USER_PROFILES, ADMIN_USERS, WAITLIST_USERS];
}

/// Errors surfaced by the Account Directory.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The directory could not be reached.
    #[error("account directory unavailable")]
    Unavailable,

    /// Wrong email or password.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already registered")]
    AlreadyRegistered,

    /// The request needs a signed-in session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A row-scoped policy refused the request.
    #[error("permission denied for {0}")]
    Forbidden(String),

    /// The addressed account does not exist.
    #[error("account not found")]
    NotFound,

    /// The request was malformed or violated a constraint.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Client-side handle on the Account Directory.
///
/// One handle corresponds to one runtime instance (tab): it carries that
/// instance's current session and auth-event stream. Table operations run
/// with the handle's session as the requester.
pub trait AccountDirectory: Send + Sync {
    /// The current session, if one exists.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, DirectoryError>> + Send;

    /// The signed-in account, if any.
    fn get_user(
        &self,
    ) -> impl Future<Output = Result<Option<AccountIdentity>, DirectoryError>> + Send;

    /// Sign in with email and password, replacing the current session.
    fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<Session, DirectoryError>> + Send;

    /// Create an account. `metadata` is stored with the account.
    fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: serde_json::Value,
    ) -> impl Future<Output = Result<AccountIdentity, DirectoryError>> + Send;

    /// End the current session.
    fn sign_out(&self) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Send a password reset to `email`. Succeeds even for unknown emails.
    fn reset_password_for_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Change the signed-in account's password.
    fn update_password(
        &self,
        password: &SecretString,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Subscribe to auth-state changes, delivered in emission order.
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    /// Rows visible to the requester that match `query`.
    fn select(
        &self,
        query: &TableQuery,
    ) -> impl Future<Output = Result<Vec<Record>, DirectoryError>> + Send;

    /// Number of rows matching `query`.
    fn count(&self, query: &TableQuery) -> impl Future<Output = Result<u64, DirectoryError>> + Send;

    /// Insert a row into `table`, returning the stored row.
    fn insert(
        &self,
        table: &str,
        record: Record,
    ) -> impl Future<Output = Result<Record, DirectoryError>> + Send;

    /// Apply `patch` to every visible row matching `query`; returns the updated rows.
    fn update(
        &self,
        query: &TableQuery,
        patch: Record,
    ) -> impl Future<Output = Result<Vec<Record>, DirectoryError>> + Send;

    /// Delete every visible row matching `query`; returns the number removed.
    fn delete(&self, query: &TableQuery)
    -> impl Future<Output = Result<u64, DirectoryError>> + Send;

    /// Remove an account and, at the directory layer, every record keyed by it.
    fn delete_account(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}
