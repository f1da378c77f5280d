//! Snapshot of the current identity as seen by one runtime instance.

use launchpad_core::{Role, UserId};

use crate::models::{AccountIdentity, AdminGrant, Identity, Profile, Session, WaitlistEntry};
use crate::services::Caller;

/// Lifecycle phase of a [`SessionContext`](super::SessionContext).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Uninitialized,
    Loading,
    /// The first load has completed, successfully or not.
    Ready,
}

/// Coarse view of a [`SessionState`] for routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Loading,
    Anonymous,
    /// Signed in; the role is `None` while no profile could be loaded.
    Authenticated(Option<Role>),
}

/// The identity bundle: session, profile and whichever role payload applies.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub session: Option<Session>,
    pub identity: Option<Identity>,
}

impl SessionState {
    /// The signed-in account, if any.
    #[must_use]
    pub fn user(&self) -> Option<&AccountIdentity> {
        self.session.as_ref().and_then(|s| s.user.as_ref())
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user().map(|u| u.id)
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.identity.as_ref().map(Identity::profile)
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.identity.as_ref().map(Identity::role)
    }

    #[must_use]
    pub fn admin_grant(&self) -> Option<&AdminGrant> {
        self.identity.as_ref().and_then(Identity::admin_grant)
    }

    #[must_use]
    pub fn waitlist_entry(&self) -> Option<&WaitlistEntry> {
        self.identity.as_ref().and_then(Identity::waitlist_entry)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    #[must_use]
    pub fn is_waitlist_user(&self) -> bool {
        self.role() == Some(Role::Waitlist)
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self.phase {
            Phase::Uninitialized => SessionStatus::Uninitialized,
            Phase::Loading => SessionStatus::Loading,
            Phase::Ready if self.user().is_none() => SessionStatus::Anonymous,
            Phase::Ready => SessionStatus::Authenticated(self.role()),
        }
    }

    /// The caller identity for service calls made from this state.
    #[must_use]
    pub fn caller(&self) -> Option<Caller> {
        self.user_id().map(|id| Caller::new(id, self.role()))
    }
}
