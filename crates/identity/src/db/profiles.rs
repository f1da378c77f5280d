//! Profile repository.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use launchpad_core::{Email, Role, UserId};

use super::{RepositoryError, decode, patch};
use crate::directory::{AccountDirectory, Record, TableQuery, tables};
use crate::models::Profile;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: String,
    email: String,
    full_name: Option<String>,
    company: Option<String>,
    position: Option<String>,
    phone: Option<String>,
    avatar_url: Option<String>,
    role: String,
    #[serde(default = "default_active")]
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const fn default_active() -> bool {
    true
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let id: UserId = row.id.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid profile id {}: {e}", row.id))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for profile {id}: {e}"))
        })?;
        let role: Role = row
            .role
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("profile {id}: {e}")))?;

        Ok(Self {
            id,
            email,
            full_name: row.full_name,
            company: row.company,
            position: row.position,
            phone: row.phone,
            avatar_url: row.avatar_url,
            role,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_profile(record: Record) -> Result<Profile, RepositoryError> {
    decode::<ProfileRow>(tables::USER_PROFILES, record)?.try_into()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for `user_profiles`.
pub struct ProfileRepository<'a, D> {
    directory: &'a D,
}

impl<'a, D: AccountDirectory> ProfileRepository<'a, D> {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    fn by_id(id: UserId) -> TableQuery {
        TableQuery::table(tables::USER_PROFILES).eq("id", id.to_string())
    }

    /// Get a profile by account ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Directory` if the directory call fails.
    /// Returns `RepositoryError::DataCorruption` if the record is malformed.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let rows = self.directory.select(&Self::by_id(id).limit(1)).await?;
        rows.into_iter().next().map(to_profile).transpose()
    }

    /// List every visible profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Directory` if the directory call fails.
    /// Returns `RepositoryError::DataCorruption` if any record is malformed.
    pub async fn list_all(&self) -> Result<Vec<Profile>, RepositoryError> {
        let query = TableQuery::table(tables::USER_PROFILES).order("created_at", false);
        let rows = self.directory.select(&query).await?;
        rows.into_iter().map(to_profile).collect()
    }

    /// Apply a column patch to one profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no visible profile has this ID.
    /// Returns `RepositoryError::Directory` if the directory refuses the update.
    pub async fn update(&self, id: UserId, changes: Record) -> Result<Profile, RepositoryError> {
        let rows = self.directory.update(&Self::by_id(id), changes).await?;
        rows.into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)
            .and_then(to_profile)
    }

    /// Set a profile's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no visible profile has this ID.
    /// Returns `RepositoryError::Directory` if the directory refuses the update.
    pub async fn set_role(&self, id: UserId, role: Role) -> Result<Profile, RepositoryError> {
        self.update(id, patch("role", role.as_str())).await
    }

    /// Stamp `last_login_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no visible profile has this ID.
    pub async fn touch_last_login(
        &self,
        id: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.update(id, patch("last_login_at", at.to_rfc3339()))
            .await
            .map(|_| ())
    }

    /// Number of profiles holding `role`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Directory` if the directory call fails.
    pub async fn count_role(&self, role: Role) -> Result<u64, RepositoryError> {
        let query = TableQuery::table(tables::USER_PROFILES).eq("role", role.as_str());
        Ok(self.directory.count(&query).await?)
    }
}
