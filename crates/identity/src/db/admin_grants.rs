//! Admin grant repository.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use launchpad_core::UserId;

use super::{RepositoryError, decode};
use crate::directory::{AccountDirectory, TableQuery, tables};
use crate::models::AdminGrant;

#[derive(Debug, Deserialize)]
struct AdminGrantRow {
    id: String,
    #[serde(default)]
    permissions: Option<Vec<String>>,
    #[serde(default)]
    can_manage_users: bool,
    #[serde(default)]
    can_manage_content: bool,
    #[serde(default)]
    can_view_analytics: bool,
    #[serde(default)]
    can_manage_settings: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminGrantRow> for AdminGrant {
    type Error = RepositoryError;

    fn try_from(row: AdminGrantRow) -> Result<Self, Self::Error> {
        let id = row.id.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid admin grant id {}: {e}", row.id))
        })?;

        Ok(Self {
            id,
            permissions: row
                .permissions
                .unwrap_or_default()
                .into_iter()
                .collect::<BTreeSet<_>>(),
            can_manage_users: row.can_manage_users,
            can_manage_content: row.can_manage_content,
            can_view_analytics: row.can_view_analytics,
            can_manage_settings: row.can_manage_settings,
            created_at: row.created_at,
        })
    }
}

/// Repository for `admin_users`.
pub struct AdminGrantRepository<'a, D> {
    directory: &'a D,
}

impl<'a, D: AccountDirectory> AdminGrantRepository<'a, D> {
    /// Create a new admin grant repository.
    #[must_use]
    pub const fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Get the grant keyed by an account ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Directory` if the directory call fails.
    /// Returns `RepositoryError::DataCorruption` if the record is malformed.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<AdminGrant>, RepositoryError> {
        let query = TableQuery::table(tables::ADMIN_USERS)
            .eq("id", id.to_string())
            .limit(1);
        let rows = self.directory.select(&query).await?;
        rows.into_iter()
            .next()
            .map(|r| -> Result<AdminGrant, RepositoryError> {
                decode::<AdminGrantRow>(tables::ADMIN_USERS, r)?.try_into()
            })
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use launchpad_core::{Capability, Email, Role};
    use secrecy::SecretString;

    use super::*;
    use crate::directory::{MemoryDirectory, Provision};

    #[tokio::test]
    async fn test_provisioned_admin_has_full_grant() {
        let directory = MemoryDirectory::new();
        let email = Email::parse("root@example.com").unwrap();
        let id = directory
            .provision(Provision::new(email.clone(), "pw-root-1", Role::Admin))
            .await
            .unwrap();
        let client = directory.client();
        client
            .sign_in_with_password(&email, &SecretString::from("pw-root-1".to_owned()))
            .await
            .unwrap();

        let grant = AdminGrantRepository::new(&client)
            .get_by_id(id)
            .await
            .unwrap()
            .unwrap();
        assert!(Capability::ALL.iter().all(|c| grant.allows(*c)));
    }

    #[tokio::test]
    async fn test_anonymous_sees_no_grant() {
        let directory = MemoryDirectory::new();
        let id = directory
            .provision(Provision::new(
                Email::parse("root@example.com").unwrap(),
                "pw-root-1",
                Role::Admin,
            ))
            .await
            .unwrap();

        let grant = AdminGrantRepository::new(&directory.client())
            .get_by_id(id)
            .await
            .unwrap();
        assert!(grant.is_none());
    }
}
