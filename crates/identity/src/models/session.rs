//! Session and auth-event types exchanged with the Account Directory.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use launchpad_core::{Email, UserId};

/// The directory's view of an account (not the profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub id: UserId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    /// Raw metadata supplied at sign-up.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// An authenticated session, one per runtime instance.
#[derive(Debug, Clone)]
pub struct Session {
    /// Signed-in account, if any.
    pub user: Option<AccountIdentity>,
    /// Opaque token authenticating directory calls.
    pub access_token: SecretString,
}

impl Session {
    /// The signed-in account's ID.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Kind of auth-state change pushed by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// An auth event together with the session it produced.
#[derive(Debug, Clone)]
pub struct AuthChange {
    pub event: AuthEvent,
    pub session: Option<Session>,
}
