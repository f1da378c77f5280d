//! Identity service.
//!
//! Turns directory records into typed identities and implements the
//! role-gated account operations. Every multi-account operation checks the
//! caller's own role first and returns `IdentityError::Unauthorized` without
//! touching the directory when the caller is not an admin. The directory's
//! row policies remain the authoritative check behind that.

mod error;

pub use error::IdentityError;

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use launchpad_core::{PriorityLevel, Role, UserId};

use crate::db::{AdminGrantRepository, ProfileRepository, WaitlistRepository};
use crate::directory::AccountDirectory;
use crate::error::add_breadcrumb;
use crate::models::{
    Access, AdminGrant, Identity, Profile, ProfilePatch, WaitlistEntry, WaitlistListing,
};

/// The account on whose behalf the service acts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    /// Role from the caller's cached profile; `None` if no profile is loaded.
    pub role: Option<Role>,
}

impl Caller {
    #[must_use]
    pub const fn new(id: UserId, role: Option<Role>) -> Self {
        Self { id, role }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Some(Role::Admin))
    }
}

/// Number of profiles per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub admin: u64,
    pub waitlist: u64,
    pub user: u64,
}

impl RoleCounts {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.admin + self.waitlist + self.user
    }

    #[must_use]
    pub const fn get(&self, role: Role) -> u64 {
        match role {
            Role::Admin => self.admin,
            Role::Waitlist => self.waitlist,
            Role::User => self.user,
        }
    }

    fn tally(&mut self, role: Role) {
        match role {
            Role::Admin => self.admin += 1,
            Role::Waitlist => self.waitlist += 1,
            Role::User => self.user += 1,
        }
    }
}

/// Identity service.
///
/// Cheap to construct; build one per operation from the current session.
pub struct IdentityService<'a, D> {
    directory: &'a D,
    caller: Option<Caller>,
}

impl<'a, D: AccountDirectory> IdentityService<'a, D> {
    /// Create a service acting as `caller` (`None` when signed out).
    #[must_use]
    pub const fn new(directory: &'a D, caller: Option<Caller>) -> Self {
        Self { directory, caller }
    }

    #[must_use]
    pub const fn caller(&self) -> Option<Caller> {
        self.caller
    }

    const fn profiles(&self) -> ProfileRepository<'a, D> {
        ProfileRepository::new(self.directory)
    }

    fn require_caller(&self) -> Result<Caller, IdentityError> {
        self.caller.ok_or_else(IdentityError::signed_out)
    }

    fn require_admin(&self, operation: &str) -> Result<Caller, IdentityError> {
        match self.caller {
            Some(caller) if caller.is_admin() => Ok(caller),
            Some(caller) => {
                warn!(user_id = %caller.id, operation, "Admin operation refused");
                Err(IdentityError::admin_required(operation))
            }
            None => Err(IdentityError::admin_required(operation)),
        }
    }

    fn target(&self, user_id: Option<UserId>) -> Result<UserId, IdentityError> {
        match user_id {
            Some(id) => Ok(id),
            None => self.require_caller().map(|c| c.id),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a profile; defaults to the caller's own.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotFound` if no visible profile has this ID.
    #[instrument(skip(self))]
    pub async fn get_profile(&self, user_id: Option<UserId>) -> Result<Profile, IdentityError> {
        let id = self.target(user_id)?;
        self.profiles()
            .get_by_id(id)
            .await?
            .ok_or(IdentityError::NotFound)
    }

    /// Get an admin grant; defaults to the caller's own.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotFound` if the grant is absent or the
    /// profile's role is not admin.
    #[instrument(skip(self))]
    pub async fn get_admin_grant(
        &self,
        user_id: Option<UserId>,
    ) -> Result<AdminGrant, IdentityError> {
        let profile = self.get_profile(user_id).await?;
        if profile.role != Role::Admin {
            return Err(IdentityError::NotFound);
        }
        AdminGrantRepository::new(self.directory)
            .get_by_id(profile.id)
            .await?
            .ok_or(IdentityError::NotFound)
    }

    /// Get a waitlist entry; defaults to the caller's own.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotFound` if the entry is absent or the
    /// profile's role is not waitlist. After an approval the stale entry row
    /// still exists but is reported as not found.
    #[instrument(skip(self))]
    pub async fn get_waitlist_entry(
        &self,
        user_id: Option<UserId>,
    ) -> Result<WaitlistEntry, IdentityError> {
        let profile = self.get_profile(user_id).await?;
        if profile.role != Role::Waitlist {
            return Err(IdentityError::NotFound);
        }
        WaitlistRepository::new(self.directory)
            .get_by_id(profile.id)
            .await?
            .ok_or(IdentityError::NotFound)
    }

    /// Load whichever of grant or entry `profile.role` calls for.
    ///
    /// A missing row is reported as not provisioned, not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the directory call itself fails.
    pub async fn load_access(&self, profile: &Profile) -> Result<Access, IdentityError> {
        let access = match profile.role {
            Role::Admin => {
                let grant = AdminGrantRepository::new(self.directory)
                    .get_by_id(profile.id)
                    .await?;
                if grant.is_none() {
                    warn!(user_id = %profile.id, "Admin grant not provisioned");
                }
                Access::Admin { grant }
            }
            Role::Waitlist => {
                let entry = WaitlistRepository::new(self.directory)
                    .get_by_id(profile.id)
                    .await?;
                if entry.is_none() {
                    warn!(user_id = %profile.id, "Waitlist entry not provisioned");
                }
                Access::Waitlist { entry }
            }
            Role::User => Access::User,
        };
        Ok(access)
    }

    /// Load the profile and role payload for `user_id` as one bundle.
    ///
    /// Returns `Ok(None)` if the account has no visible profile.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory call fails or a record is malformed.
    #[instrument(skip(self))]
    pub async fn load_identity(&self, user_id: UserId) -> Result<Option<Identity>, IdentityError> {
        let Some(profile) = self.profiles().get_by_id(user_id).await? else {
            debug!("No profile for account");
            return Ok(None);
        };
        let (grant, entry) = match self.load_access(&profile).await? {
            Access::Admin { grant } => (grant, None),
            Access::Waitlist { entry } => (None, entry),
            Access::User => (None, None),
        };
        Ok(Some(Identity::assemble(profile, grant, entry)))
    }

    // =========================================================================
    // Self-service
    // =========================================================================

    /// Update the caller's own display attributes.
    ///
    /// An empty patch returns the current profile unchanged.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` when signed out.
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Profile, IdentityError> {
        let caller = self.require_caller()?;
        if patch.is_empty() {
            return self.get_profile(Some(caller.id)).await;
        }
        Ok(self.profiles().update(caller.id, patch.into_record()).await?)
    }

    /// Current number of waitlisted accounts.
    ///
    /// Open to any signed-in caller; the self-service standing view needs it.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` when signed out.
    pub async fn waitlist_size(&self) -> Result<u64, IdentityError> {
        self.require_caller()?;
        Ok(self.profiles().count_role(Role::Waitlist).await?)
    }

    /// Stamp `last_login_at` for a fresh sign-in. Failures are logged only.
    pub(crate) async fn record_login(&self, user_id: UserId) {
        if let Err(e) = self.profiles().touch_last_login(user_id, Utc::now()).await {
            warn!(user_id = %user_id, error = %e, "Failed to record login");
        }
    }

    // =========================================================================
    // Admin-only
    // =========================================================================

    /// Every profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the caller is not an admin.
    #[instrument(skip(self))]
    pub async fn list_all_profiles(&self) -> Result<Vec<Profile>, IdentityError> {
        self.require_admin("list_all_profiles")?;
        Ok(self.profiles().list_all().await?)
    }

    /// Every waitlist entry joined with its owner's display fields, lowest
    /// position first.
    ///
    /// Entries whose profile is no longer waitlisted are left out.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the caller is not an admin.
    #[instrument(skip(self))]
    pub async fn list_all_waitlist_entries(&self) -> Result<Vec<WaitlistListing>, IdentityError> {
        self.require_admin("list_all_waitlist_entries")?;

        let entries = WaitlistRepository::new(self.directory).list_all().await?;
        let profiles: HashMap<UserId, Profile> = self
            .profiles()
            .list_all()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let listings = entries
            .into_iter()
            .filter_map(|entry| {
                let owner = profiles
                    .get(&entry.id)
                    .filter(|p| p.role == Role::Waitlist)?;
                Some(WaitlistListing {
                    email: owner.email.clone(),
                    full_name: owner.full_name.clone(),
                    company: owner.company.clone(),
                    entry,
                })
            })
            .collect();
        Ok(listings)
    }

    /// Set an account's role.
    ///
    /// Grant and entry rows are neither created nor removed.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the caller is not an admin.
    /// Returns `IdentityError::NotFound` if the account does not exist.
    #[instrument(skip(self))]
    pub async fn update_role(&self, user_id: UserId, role: Role) -> Result<Profile, IdentityError> {
        let caller = self.require_admin("update_role")?;
        let profile = self.profiles().set_role(user_id, role).await?;

        info!(admin_id = %caller.id, "Role updated");
        let id = user_id.to_string();
        add_breadcrumb(
            "admin",
            "Role updated",
            Some(&[("user_id", id.as_str()), ("role", role.as_str())]),
        );
        Ok(profile)
    }

    /// Overwrite one entry's position. Other entries keep theirs, so gaps and
    /// ties are possible.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the caller is not an admin.
    /// Returns `IdentityError::Invalid` if `position` is zero.
    #[instrument(skip(self))]
    pub async fn update_waitlist_position(
        &self,
        user_id: UserId,
        position: u32,
    ) -> Result<WaitlistEntry, IdentityError> {
        let caller = self.require_admin("update_waitlist_position")?;
        if position == 0 {
            return Err(IdentityError::Invalid(
                "Position must be a positive integer".to_string(),
            ));
        }
        let entry = WaitlistRepository::new(self.directory)
            .set_position(user_id, position)
            .await?;

        info!(admin_id = %caller.id, "Waitlist position updated");
        let (id, position) = (user_id.to_string(), position.to_string());
        add_breadcrumb(
            "admin",
            "Waitlist position updated",
            Some(&[("user_id", id.as_str()), ("position", position.as_str())]),
        );
        Ok(entry)
    }

    /// Set one entry's priority level.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the caller is not an admin.
    #[instrument(skip(self))]
    pub async fn update_waitlist_priority(
        &self,
        user_id: UserId,
        priority: PriorityLevel,
    ) -> Result<WaitlistEntry, IdentityError> {
        let caller = self.require_admin("update_waitlist_priority")?;
        let entry = WaitlistRepository::new(self.directory)
            .set_priority(user_id, priority)
            .await?;

        info!(admin_id = %caller.id, "Waitlist priority updated");
        Ok(entry)
    }

    /// Remove an account. The directory cascades to its profile, grant and
    /// entry rows.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the caller is not an admin.
    /// Returns `IdentityError::NotFound` if the account does not exist.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, user_id: UserId) -> Result<(), IdentityError> {
        let caller = self.require_admin("delete_account")?;
        self.directory.delete_account(user_id).await?;

        info!(admin_id = %caller.id, "Account deleted");
        let id = user_id.to_string();
        add_breadcrumb("admin", "Account deleted", Some(&[("user_id", id.as_str())]));
        Ok(())
    }

    /// Tally profiles by role.
    ///
    /// Scans every profile, so `admin + waitlist + user` always equals the
    /// number of profiles.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` if the caller is not an admin.
    #[instrument(skip(self))]
    pub async fn count_by_role(&self) -> Result<RoleCounts, IdentityError> {
        self.require_admin("count_by_role")?;
        let mut counts = RoleCounts::default();
        for profile in self.profiles().list_all().await? {
            counts.tally(profile.role);
        }
        Ok(counts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use launchpad_core::Email;
    use secrecy::SecretString;

    use super::*;
    use crate::directory::{DirectoryClient, MemoryDirectory, Provision, tables};

    const PASSWORD: &str = "correct-horse";

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    async fn seed(directory: &MemoryDirectory, address: &str, role: Role) -> UserId {
        directory
            .provision(Provision::new(email(address), PASSWORD, role))
            .await
            .unwrap()
    }

    async fn sign_in(directory: &MemoryDirectory, address: &str) -> (DirectoryClient, Caller) {
        let client = directory.client();
        let session = client
            .sign_in_with_password(&email(address), &SecretString::from(PASSWORD.to_owned()))
            .await
            .unwrap();
        let id = session.user_id().unwrap();
        let role = ProfileRepository::new(&client)
            .get_by_id(id)
            .await
            .unwrap()
            .map(|p| p.role);
        (client, Caller::new(id, role))
    }

    #[tokio::test]
    async fn test_non_admin_list_is_unauthorized() {
        let directory = MemoryDirectory::new();
        seed(&directory, "w@example.com", Role::Waitlist).await;
        let (client, caller) = sign_in(&directory, "w@example.com").await;
        let service = IdentityService::new(&client, Some(caller));

        assert!(matches!(
            service.list_all_profiles().await,
            Err(IdentityError::Unauthorized(_))
        ));
        assert!(matches!(
            service.count_by_role().await,
            Err(IdentityError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_non_admin_update_role_leaves_row_untouched() {
        let directory = MemoryDirectory::new();
        let target = seed(&directory, "target@example.com", Role::Waitlist).await;
        seed(&directory, "user@example.com", Role::User).await;
        let (client, caller) = sign_in(&directory, "user@example.com").await;

        let result = IdentityService::new(&client, Some(caller))
            .update_role(target, Role::Admin)
            .await;
        assert!(matches!(result, Err(IdentityError::Unauthorized(_))));

        let rows = directory.records(tables::USER_PROFILES).await;
        let row = rows
            .iter()
            .find(|r| r["id"] == target.to_string())
            .unwrap();
        assert_eq!(row["role"], "waitlist");
    }

    #[tokio::test]
    async fn test_approve_keeps_stale_entry_but_hides_it() {
        let directory = MemoryDirectory::new();
        seed(&directory, "root@example.com", Role::Admin).await;
        let target = seed(&directory, "w@example.com", Role::Waitlist).await;
        let (client, caller) = sign_in(&directory, "root@example.com").await;
        let service = IdentityService::new(&client, Some(caller));

        let profile = service.update_role(target, Role::User).await.unwrap();
        assert_eq!(profile.role, Role::User);

        assert_eq!(directory.records(tables::WAITLIST_USERS).await.len(), 1);
        assert_eq!(
            service.get_waitlist_entry(Some(target)).await,
            Err(IdentityError::NotFound)
        );
        assert!(service.list_all_waitlist_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_waitlist_listing_ordered_by_position() {
        let directory = MemoryDirectory::new();
        seed(&directory, "root@example.com", Role::Admin).await;
        let first = seed(&directory, "a@example.com", Role::Waitlist).await;
        let second = seed(&directory, "b@example.com", Role::Waitlist).await;
        let (client, caller) = sign_in(&directory, "root@example.com").await;
        let service = IdentityService::new(&client, Some(caller));

        service.update_waitlist_position(first, 9).await.unwrap();
        let listings = service.list_all_waitlist_entries().await.unwrap();
        let order: Vec<UserId> = listings.iter().map(WaitlistListing::id).collect();
        assert_eq!(order, vec![second, first]);
        assert_eq!(listings[1].position(), 9);
        assert_eq!(listings[0].email, email("b@example.com"));
    }

    #[tokio::test]
    async fn test_position_zero_is_invalid() {
        let directory = MemoryDirectory::new();
        seed(&directory, "root@example.com", Role::Admin).await;
        let target = seed(&directory, "w@example.com", Role::Waitlist).await;
        let (client, caller) = sign_in(&directory, "root@example.com").await;

        let result = IdentityService::new(&client, Some(caller))
            .update_waitlist_position(target, 0)
            .await;
        assert!(matches!(result, Err(IdentityError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_position_collision_allowed() {
        let directory = MemoryDirectory::new();
        seed(&directory, "root@example.com", Role::Admin).await;
        seed(&directory, "a@example.com", Role::Waitlist).await;
        let b = seed(&directory, "b@example.com", Role::Waitlist).await;
        let (client, caller) = sign_in(&directory, "root@example.com").await;
        let service = IdentityService::new(&client, Some(caller));

        service.update_waitlist_position(b, 1).await.unwrap();
        let positions: Vec<u32> = service
            .list_all_waitlist_entries()
            .await
            .unwrap()
            .iter()
            .map(WaitlistListing::position)
            .collect();
        assert_eq!(positions, vec![1, 1]);
    }

    #[tokio::test]
    async fn test_counts_partition_profiles() {
        let directory = MemoryDirectory::new();
        seed(&directory, "root@example.com", Role::Admin).await;
        seed(&directory, "a@example.com", Role::Waitlist).await;
        seed(&directory, "b@example.com", Role::Waitlist).await;
        seed(&directory, "c@example.com", Role::User).await;
        let (client, caller) = sign_in(&directory, "root@example.com").await;
        let service = IdentityService::new(&client, Some(caller));

        let counts = service.count_by_role().await.unwrap();
        assert_eq!(
            counts,
            RoleCounts {
                admin: 1,
                waitlist: 2,
                user: 1
            }
        );
        let profiles = service.list_all_profiles().await.unwrap();
        assert_eq!(counts.total(), profiles.len() as u64);
        for role in Role::ALL {
            let expected = profiles.iter().filter(|p| p.role == role).count() as u64;
            assert_eq!(counts.get(role), expected);
        }
    }

    #[tokio::test]
    async fn test_waitlist_size_open_to_waitlisted_caller() {
        let directory = MemoryDirectory::new();
        seed(&directory, "a@example.com", Role::Waitlist).await;
        seed(&directory, "b@example.com", Role::Waitlist).await;
        let (client, caller) = sign_in(&directory, "a@example.com").await;

        let size = IdentityService::new(&client, Some(caller))
            .waitlist_size()
            .await
            .unwrap();
        assert_eq!(size, 2);
    }

    #[tokio::test]
    async fn test_update_own_profile_and_record_login() {
        let directory = MemoryDirectory::new();
        seed(&directory, "w@example.com", Role::Waitlist).await;
        let (client, caller) = sign_in(&directory, "w@example.com").await;
        let service = IdentityService::new(&client, Some(caller));

        let updated = service
            .update_profile(ProfilePatch {
                company: Some("  Acme  ".to_string()),
                ..ProfilePatch::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.company.as_deref(), Some("Acme"));

        service.record_login(caller.id).await;
        let profile = service.get_profile(None).await.unwrap();
        assert!(profile.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_load_identity_unprovisioned_entry() {
        let directory = MemoryDirectory::new();
        seed(&directory, "root@example.com", Role::Admin).await;
        let target = seed(&directory, "u@example.com", Role::User).await;
        let (client, caller) = sign_in(&directory, "root@example.com").await;
        let service = IdentityService::new(&client, Some(caller));

        service.update_role(target, Role::Waitlist).await.unwrap();
        let identity = service.load_identity(target).await.unwrap().unwrap();
        assert_eq!(identity.access(), &Access::Waitlist { entry: None });
    }

    #[tokio::test]
    async fn test_outage_maps_to_directory_unavailable() {
        let directory = MemoryDirectory::new();
        seed(&directory, "root@example.com", Role::Admin).await;
        let (client, caller) = sign_in(&directory, "root@example.com").await;
        directory.set_available(false);

        let result = IdentityService::new(&client, Some(caller))
            .list_all_profiles()
            .await;
        assert_eq!(result, Err(IdentityError::DirectoryUnavailable));
    }
}
