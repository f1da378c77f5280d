//! The derived "current identity" bundle.
//!
//! A profile's role decides which of [`AdminGrant`] or [`WaitlistEntry`]
//! accompanies it. [`Access`] ties the two together so a grant can only be
//! reached through an admin identity and an entry only through a waitlisted
//! one.

use serde::Serialize;

use launchpad_core::Role;

use super::{AdminGrant, Profile, WaitlistEntry};

/// Role-specific payload of an identity.
///
/// A `None` payload means the role has been assigned but its grant or entry
/// row has not been provisioned yet. Callers render that state, they do not
/// treat it as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Access {
    Admin { grant: Option<AdminGrant> },
    Waitlist { entry: Option<WaitlistEntry> },
    User,
}

impl Access {
    /// The role this access variant corresponds to.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Admin { .. } => Role::Admin,
            Self::Waitlist { .. } => Role::Waitlist,
            Self::User => Role::User,
        }
    }

    /// Access for `role` with no payload loaded.
    #[must_use]
    pub const fn unprovisioned(role: Role) -> Self {
        match role {
            Role::Admin => Self::Admin { grant: None },
            Role::Waitlist => Self::Waitlist { entry: None },
            Role::User => Self::User,
        }
    }

    /// Access for `role`, keeping only the payload that matches it.
    #[must_use]
    pub fn for_role(
        role: Role,
        grant: Option<AdminGrant>,
        entry: Option<WaitlistEntry>,
    ) -> Self {
        match role {
            Role::Admin => Self::Admin { grant },
            Role::Waitlist => Self::Waitlist { entry },
            Role::User => Self::User,
        }
    }
}

/// A profile bundled with its role-specific access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    profile: Profile,
    access: Access,
}

impl Identity {
    /// Bundle `profile` with whichever payload its role calls for.
    ///
    /// A payload that does not match the profile's role is dropped.
    #[must_use]
    pub fn assemble(
        profile: Profile,
        grant: Option<AdminGrant>,
        entry: Option<WaitlistEntry>,
    ) -> Self {
        let access = Access::for_role(profile.role, grant, entry);
        Self { profile, access }
    }

    #[must_use]
    pub const fn profile(&self) -> &Profile {
        &self.profile
    }

    #[must_use]
    pub const fn access(&self) -> &Access {
        &self.access
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.access.role()
    }

    /// The admin grant, only when the role is admin and the grant exists.
    #[must_use]
    pub const fn admin_grant(&self) -> Option<&AdminGrant> {
        match &self.access {
            Access::Admin { grant } => grant.as_ref(),
            _ => None,
        }
    }

    /// The waitlist entry, only when the role is waitlist and the entry exists.
    #[must_use]
    pub const fn waitlist_entry(&self) -> Option<&WaitlistEntry> {
        match &self.access {
            Access::Waitlist { entry } => entry.as_ref(),
            _ => None,
        }
    }
}
