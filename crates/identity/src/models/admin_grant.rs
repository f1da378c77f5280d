//! Admin grant domain type.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use launchpad_core::{Capability, UserId};

/// Capabilities held by an admin account.
///
/// Only meaningful while the owning profile's role is `admin`. The boolean
/// flags are a denormalized view of `permissions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminGrant {
    /// Owning account (same as the profile ID).
    pub id: UserId,
    /// Capability tags.
    pub permissions: BTreeSet<String>,
    pub can_manage_users: bool,
    pub can_manage_content: bool,
    pub can_view_analytics: bool,
    pub can_manage_settings: bool,
    pub created_at: DateTime<Utc>,
}

impl AdminGrant {
    /// A grant carrying every capability.
    #[must_use]
    pub fn full(id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            permissions: Capability::ALL
                .iter()
                .map(|c| c.as_str().to_owned())
                .collect(),
            can_manage_users: true,
            can_manage_content: true,
            can_view_analytics: true,
            can_manage_settings: true,
            created_at,
        }
    }

    /// Whether this grant allows `capability`, by flag or by tag.
    #[must_use]
    pub fn allows(&self, capability: Capability) -> bool {
        let flag = match capability {
            Capability::ManageUsers => self.can_manage_users,
            Capability::ManageContent => self.can_manage_content,
            Capability::ViewAnalytics => self.can_view_analytics,
            Capability::ManageSettings => self.can_manage_settings,
        };
        flag || self.permissions.contains(capability.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_grant_allows_everything() {
        let grant = AdminGrant::full(UserId::random(), Utc::now());
        assert!(Capability::ALL.iter().all(|c| grant.allows(*c)));
    }

    #[test]
    fn test_tag_without_flag_still_allows() {
        let mut grant = AdminGrant::full(UserId::random(), Utc::now());
        grant.can_view_analytics = false;
        assert!(grant.allows(Capability::ViewAnalytics));

        grant.permissions.remove("view_analytics");
        assert!(!grant.allows(Capability::ViewAnalytics));
    }
}
