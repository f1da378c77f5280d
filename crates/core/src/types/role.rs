//! Account roles and admin capabilities.

use serde::{Deserialize, Serialize};

/// Error returned when a directory string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed (e.g. "role").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// The single authorization role held by an account.
///
/// Every account has exactly one role. Moving between roles is an
/// admin-only operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operator with access to account and waitlist management.
    Admin,
    /// Signed up but not yet admitted; holds a waitlist position.
    Waitlist,
    /// Admitted customer.
    User,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Waitlist, Self::User];

    /// The directory spelling of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Waitlist => "waitlist",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "waitlist" => Ok(Self::Waitlist),
            "user" => Ok(Self::User),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

/// A capability an admin grant may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create, edit, approve and delete accounts.
    ManageUsers,
    /// Edit site content.
    ManageContent,
    /// Read analytics dashboards.
    ViewAnalytics,
    /// Change application settings.
    ManageSettings,
}

impl Capability {
    /// All capabilities.
    pub const ALL: [Self; 4] = [
        Self::ManageUsers,
        Self::ManageContent,
        Self::ViewAnalytics,
        Self::ManageSettings,
    ];

    /// The permission tag used in grant records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageContent => "manage_content",
            Self::ViewAnalytics => "view_analytics",
            Self::ManageSettings => "manage_settings",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("capability", s))
    }
}
