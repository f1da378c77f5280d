//! Waitlist entry repository.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use launchpad_core::{PriorityLevel, UserId};

use super::{RepositoryError, decode, patch};
use crate::directory::{AccountDirectory, Record, TableQuery, tables};
use crate::models::WaitlistEntry;

#[derive(Debug, Deserialize)]
struct WaitlistRow {
    id: String,
    position: i64,
    #[serde(default)]
    priority_level: Option<String>,
    expected_access_date: Option<NaiveDate>,
    referral_source: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<WaitlistRow> for WaitlistEntry {
    type Error = RepositoryError;

    fn try_from(row: WaitlistRow) -> Result<Self, Self::Error> {
        let id: UserId = row.id.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid waitlist id {}: {e}", row.id))
        })?;
        let position = u32::try_from(row.position)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "waitlist entry {id} has invalid position {}",
                    row.position
                ))
            })?;
        let priority_level = row
            .priority_level
            .as_deref()
            .map(str::parse::<PriorityLevel>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("waitlist entry {id}: {e}")))?
            .unwrap_or_default();

        Ok(Self {
            id,
            position,
            priority_level,
            expected_access_date: row.expected_access_date,
            referral_source: row.referral_source,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

fn to_entry(record: Record) -> Result<WaitlistEntry, RepositoryError> {
    decode::<WaitlistRow>(tables::WAITLIST_USERS, record)?.try_into()
}

/// Repository for `waitlist_users`.
pub struct WaitlistRepository<'a, D> {
    directory: &'a D,
}

impl<'a, D: AccountDirectory> WaitlistRepository<'a, D> {
    /// Create a new waitlist repository.
    #[must_use]
    pub const fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    fn by_id(id: UserId) -> TableQuery {
        TableQuery::table(tables::WAITLIST_USERS).eq("id", id.to_string())
    }

    /// Get the entry keyed by an account ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Directory` if the directory call fails.
    /// Returns `RepositoryError::DataCorruption` if the record is malformed.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<WaitlistEntry>, RepositoryError> {
        let rows = self.directory.select(&Self::by_id(id).limit(1)).await?;
        rows.into_iter().next().map(to_entry).transpose()
    }

    /// List every visible entry, lowest position first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Directory` if the directory call fails.
    /// Returns `RepositoryError::DataCorruption` if any record is malformed.
    pub async fn list_all(&self) -> Result<Vec<WaitlistEntry>, RepositoryError> {
        let query = TableQuery::table(tables::WAITLIST_USERS).order("position", true);
        let rows = self.directory.select(&query).await?;
        rows.into_iter().map(to_entry).collect()
    }

    /// Overwrite one entry's position. Other entries are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no visible entry has this ID.
    pub async fn set_position(
        &self,
        id: UserId,
        position: u32,
    ) -> Result<WaitlistEntry, RepositoryError> {
        self.apply(id, patch("position", position)).await
    }

    /// Set one entry's priority level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no visible entry has this ID.
    pub async fn set_priority(
        &self,
        id: UserId,
        priority: PriorityLevel,
    ) -> Result<WaitlistEntry, RepositoryError> {
        self.apply(id, patch("priority_level", priority.as_str()))
            .await
    }

    async fn apply(&self, id: UserId, changes: Record) -> Result<WaitlistEntry, RepositoryError> {
        let rows = self.directory.update(&Self::by_id(id), changes).await?;
        rows.into_iter()
            .next()
            .ok_or(RepositoryError::NotFound)
            .and_then(to_entry)
    }
}
