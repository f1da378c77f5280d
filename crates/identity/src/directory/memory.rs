//! In-process Account Directory.
//!
//! [`MemoryDirectory`] is the shared store (accounts, sessions, record
//! collections). Each runtime instance talks to it through its own
//! [`DirectoryClient`], which carries that instance's session and auth-event
//! stream, exactly as a hosted directory's per-tab SDK client would.
//!
//! The store enforces the same row-scoped rules a hosted directory applies:
//!
//! - `user_profiles`: read own row or any row as admin; owners may edit their
//!   display fields, only admins may change `role`, `is_active`, `email`
//! - `admin_users`, `waitlist_users`: read own row; admins read and write all
//! - aggregate counts over `user_profiles` and `waitlist_users` are open to
//!   any signed-in account
//! - form collections accept inserts from anyone; only admins read them
//!
//! New sign-ups are provisioned as `waitlist` accounts at the back of the
//! line.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Utc};
use rand_core::OsRng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;

use launchpad_core::{Capability, Email, PriorityLevel, Role, UserId};

use super::{AccountDirectory, DirectoryError, Record, TableQuery, tables};
use crate::models::{AccountIdentity, AuthChange, AuthEvent, Session};

/// Auth events buffered per client before slow subscribers start lagging.
const EVENT_CAPACITY: usize = 64;

/// Profile columns only an admin may change.
const PROTECTED_PROFILE_COLUMNS: [&str; 4] = ["id", "email", "role", "is_active"];

/// Form collections visitors may insert into.
const FORM_TABLES: [&str; 3] = [
    tables::DEMO_REQUESTS,
    tables::CONTACT_SUBMISSIONS,
    tables::NEWSLETTER_SUBSCRIBERS,
];

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    id: UserId,
    email: Email,
    password_hash: String,
    created_at: DateTime<Utc>,
    last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    metadata: Value,
}

impl StoredAccount {
    fn identity(&self) -> AccountIdentity {
        AccountIdentity {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
            last_sign_in_at: self.last_sign_in_at,
            metadata: self.metadata.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    accounts: BTreeMap<UserId, StoredAccount>,
    tables: BTreeMap<String, Vec<Record>>,
    /// Access token -> account.
    sessions: HashMap<String, UserId>,
    recovery_outbox: Vec<Email>,
}

impl Store {
    fn table_mut(&mut self, table: &str) -> &mut Vec<Record> {
        self.tables.entry(table.to_owned()).or_default()
    }

    fn rows(&self, table: &str) -> &[Record] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }

    fn account_by_email(&self, email: &Email) -> Option<&StoredAccount> {
        self.accounts.values().find(|a| &a.email == email)
    }

    fn role_of(&self, id: UserId) -> Option<Role> {
        self.rows(tables::USER_PROFILES)
            .iter()
            .find(|row| row_id(row) == Some(id))
            .and_then(|row| row.get("role"))
            .and_then(Value::as_str)
            .and_then(|role| role.parse().ok())
    }

    fn requester(&self, session: Option<&Session>) -> Requester {
        let Some(id) = session.and_then(|s| self.sessions.get(s.access_token.expose_secret()))
        else {
            return Requester::Anonymous;
        };
        Requester::Account {
            id: *id,
            admin: self.role_of(*id) == Some(Role::Admin),
        }
    }

    fn next_position(&self) -> u32 {
        self.rows(tables::WAITLIST_USERS)
            .iter()
            .filter_map(|row| row.get("position").and_then(Value::as_u64))
            .max()
            .map_or(1, |max| u32::try_from(max).unwrap_or(u32::MAX).saturating_add(1))
    }

    fn open_session(&mut self, id: UserId) -> SecretString {
        let token = format!("lp_{}", Uuid::new_v4().simple());
        self.sessions.insert(token.clone(), id);
        SecretString::from(token)
    }

    /// Create an account plus its profile and role rows.
    fn create_account(
        &mut self,
        provision: &Provision,
        password_hash: String,
        metadata: Value,
    ) -> Result<StoredAccount, DirectoryError> {
        if self.account_by_email(&provision.email).is_some() {
            return Err(DirectoryError::AlreadyRegistered);
        }

        let now = Utc::now();
        let account = StoredAccount {
            id: UserId::random(),
            email: provision.email.clone(),
            password_hash,
            created_at: now,
            last_sign_in_at: None,
            metadata,
        };

        self.table_mut(tables::USER_PROFILES).push(record(json!({
            "id": account.id,
            "email": account.email,
            "full_name": provision.full_name,
            "company": provision.company,
            "position": null,
            "phone": null,
            "avatar_url": null,
            "role": provision.role,
            "is_active": true,
            "last_login_at": null,
            "created_at": now,
            "updated_at": now,
        })));

        match provision.role {
            Role::Admin => {
                let permissions: Vec<&str> = Capability::ALL.iter().map(|c| c.as_str()).collect();
                self.table_mut(tables::ADMIN_USERS).push(record(json!({
                    "id": account.id,
                    "permissions": permissions,
                    "can_manage_users": true,
                    "can_manage_content": true,
                    "can_view_analytics": true,
                    "can_manage_settings": true,
                    "created_at": now,
                })));
            }
            Role::Waitlist => {
                let position = provision
                    .position
                    .unwrap_or_else(|| self.next_position());
                self.table_mut(tables::WAITLIST_USERS).push(record(json!({
                    "id": account.id,
                    "position": position,
                    "priority_level": provision.priority,
                    "expected_access_date": null,
                    "referral_source": provision.referral_source,
                    "notes": null,
                    "created_at": now,
                })));
            }
            Role::User => {}
        }

        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

// =============================================================================
// Access policies
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requester {
    Anonymous,
    Account { id: UserId, admin: bool },
}

impl Requester {
    const fn is_admin(self) -> bool {
        matches!(self, Self::Account { admin: true, .. })
    }

    fn owns(self, row: &Record) -> bool {
        match self {
            Self::Anonymous => false,
            Self::Account { id, .. } => row_id(row) == Some(id),
        }
    }

    fn require_admin(self, table: &str) -> Result<(), DirectoryError> {
        match self {
            Self::Anonymous => Err(DirectoryError::NotAuthenticated),
            Self::Account { admin: true, .. } => Ok(()),
            Self::Account { .. } => Err(DirectoryError::Forbidden(table.to_owned())),
        }
    }
}

fn can_read(requester: Requester, table: &str, row: &Record) -> bool {
    requester.is_admin() || (tables::ACCOUNT_SCOPED.contains(&table) && requester.owns(row))
}

fn check_write(
    requester: Requester,
    table: &str,
    row: &Record,
    patch: &Record,
) -> Result<(), DirectoryError> {
    if requester.is_admin() {
        return Ok(());
    }
    if requester == Requester::Anonymous {
        return Err(DirectoryError::NotAuthenticated);
    }
    let own_profile = table == tables::USER_PROFILES && requester.owns(row);
    let touches_protected = patch
        .keys()
        .any(|column| PROTECTED_PROFILE_COLUMNS.contains(&column.as_str()));
    if own_profile && !touches_protected {
        Ok(())
    } else {
        Err(DirectoryError::Forbidden(table.to_owned()))
    }
}

fn check_insert(requester: Requester, table: &str) -> Result<(), DirectoryError> {
    if FORM_TABLES.contains(&table) {
        return Ok(());
    }
    requester.require_admin(table)
}

fn row_id(row: &Record) -> Option<UserId> {
    row.get("id")
        .and_then(Value::as_str)
        .and_then(|id| id.parse().ok())
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, DirectoryError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DirectoryError::Rejected(format!("password hashing failed: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), DirectoryError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| DirectoryError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| DirectoryError::InvalidCredentials)
}

fn metadata_string(metadata: &Value, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

// =============================================================================
// Shared directory
// =============================================================================

/// Account to create directly in the store, bypassing sign-up.
#[derive(Debug, Clone)]
pub struct Provision {
    pub email: Email,
    pub password: SecretString,
    pub role: Role,
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub referral_source: Option<String>,
    /// Waitlist priority (waitlist role only).
    pub priority: PriorityLevel,
    /// Explicit waitlist position; defaults to the back of the line.
    pub position: Option<u32>,
}

impl Provision {
    #[must_use]
    pub fn new(email: Email, password: &str, role: Role) -> Self {
        Self {
            email,
            password: SecretString::from(password.to_owned()),
            role,
            full_name: None,
            company: None,
            referral_source: None,
            priority: PriorityLevel::default(),
            position: None,
        }
    }
}

/// Serializable copy of a directory's accounts and collections.
///
/// Sessions and the password-reset outbox are not part of a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    accounts: Vec<StoredAccount>,
    tables: BTreeMap<String, Vec<Record>>,
}

impl DirectorySnapshot {
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

#[derive(Debug, Default)]
struct Shared {
    store: Mutex<Store>,
    offline: AtomicBool,
}

/// Shared in-process directory store.
///
/// Cheap to clone; clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Shared>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a directory from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: DirectorySnapshot) -> Self {
        let store = Store {
            accounts: snapshot.accounts.into_iter().map(|a| (a.id, a)).collect(),
            tables: snapshot.tables,
            ..Store::default()
        };
        Self {
            inner: Arc::new(Shared {
                store: Mutex::new(store),
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// Copy the current accounts and collections.
    pub async fn snapshot(&self) -> DirectorySnapshot {
        let store = self.inner.store.lock().await;
        DirectorySnapshot {
            accounts: store.accounts.values().cloned().collect(),
            tables: store.tables.clone(),
        }
    }

    /// Simulate the directory going down (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.inner.offline.store(!available, Ordering::SeqCst);
    }

    /// Open a new client with its own session and event stream.
    #[must_use]
    pub fn client(&self) -> DirectoryClient {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        DirectoryClient {
            directory: self.clone(),
            session: Mutex::new(None),
            events,
        }
    }

    /// Create an account with any role, bypassing sign-up and policies.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::AlreadyRegistered` if the email is taken.
    pub async fn provision(&self, provision: Provision) -> Result<UserId, DirectoryError> {
        let password_hash = hash_password(provision.password.expose_secret())?;
        let metadata = json!({
            "full_name": provision.full_name,
            "company": provision.company,
            "referral_source": provision.referral_source,
        });
        let mut store = self.inner.store.lock().await;
        let account = store.create_account(&provision, password_hash, metadata)?;
        Ok(account.id)
    }

    /// Look up an account ID by email, bypassing policies.
    pub async fn account_id(&self, email: &Email) -> Option<UserId> {
        let store = self.inner.store.lock().await;
        store.account_by_email(email).map(|a| a.id)
    }

    /// Every row of `table`, bypassing policies.
    pub async fn records(&self, table: &str) -> Vec<Record> {
        let store = self.inner.store.lock().await;
        store.rows(table).to_vec()
    }

    /// Emails that requested a password reset, oldest first.
    pub async fn recovery_requests(&self) -> Vec<Email> {
        let store = self.inner.store.lock().await;
        store.recovery_outbox.clone()
    }

    fn ensure_available(&self) -> Result<(), DirectoryError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(DirectoryError::Unavailable)
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// Per-instance client
// =============================================================================

/// One runtime instance's connection to a [`MemoryDirectory`].
pub struct DirectoryClient {
    directory: MemoryDirectory,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
}

impl std::fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// The shared directory this client talks to.
    #[must_use]
    pub const fn directory(&self) -> &MemoryDirectory {
        &self.directory
    }

    async fn current_session(&self) -> Option<Session> {
        self.session.lock().await.clone()
    }

    /// Swap in `session`, revoke the previous token, and announce the change.
    async fn replace_session(&self, session: Option<Session>, event: AuthEvent) {
        let previous = {
            let mut guard = self.session.lock().await;
            std::mem::replace(&mut *guard, session.clone())
        };

        if let Some(previous) = previous {
            let replaced = session.as_ref().is_none_or(|s| {
                s.access_token.expose_secret() != previous.access_token.expose_secret()
            });
            if replaced {
                let mut store = self.directory.inner.store.lock().await;
                store.sessions.remove(previous.access_token.expose_secret());
            }
        }

        let _ = self.events.send(AuthChange { event, session });
    }

    async fn requester(&self) -> (Requester, tokio::sync::MutexGuard<'_, Store>) {
        let session = self.current_session().await;
        let store = self.directory.inner.store.lock().await;
        let requester = store.requester(session.as_ref());
        (requester, store)
    }
}

impl AccountDirectory for DirectoryClient {
    async fn get_session(&self) -> Result<Option<Session>, DirectoryError> {
        self.directory.ensure_available()?;
        let Some(session) = self.current_session().await else {
            return Ok(None);
        };
        let store = self.directory.inner.store.lock().await;
        let live = store
            .sessions
            .contains_key(session.access_token.expose_secret());
        Ok(live.then_some(session))
    }

    async fn get_user(&self) -> Result<Option<AccountIdentity>, DirectoryError> {
        Ok(self.get_session().await?.and_then(|s| s.user))
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, DirectoryError> {
        self.directory.ensure_available()?;
        let password_hash = {
            let store = self.directory.inner.store.lock().await;
            store
                .account_by_email(email)
                .map(|a| a.password_hash.clone())
                .ok_or(DirectoryError::InvalidCredentials)?
        };
        verify_password(password.expose_secret(), &password_hash)?;

        let session = {
            let mut store = self.directory.inner.store.lock().await;
            let account = store
                .accounts
                .values_mut()
                .find(|a| &a.email == email)
                .ok_or(DirectoryError::InvalidCredentials)?;
            account.last_sign_in_at = Some(Utc::now());
            let user = account.identity();
            let access_token = store.open_session(user.id);
            Session {
                user: Some(user),
                access_token,
            }
        };

        self.replace_session(Some(session.clone()), AuthEvent::SignedIn)
            .await;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: Value,
    ) -> Result<AccountIdentity, DirectoryError> {
        self.directory.ensure_available()?;
        let password_hash = hash_password(password.expose_secret())?;
        let provision = Provision {
            full_name: metadata_string(&metadata, "full_name"),
            company: metadata_string(&metadata, "company"),
            referral_source: metadata_string(&metadata, "referral_source"),
            ..Provision::new(email.clone(), "", Role::Waitlist)
        };

        let session = {
            let mut store = self.directory.inner.store.lock().await;
            let account = store.create_account(&provision, password_hash, metadata)?;
            let access_token = store.open_session(account.id);
            Session {
                user: Some(account.identity()),
                access_token,
            }
        };

        let user = session.user.clone().ok_or(DirectoryError::NotFound)?;
        self.replace_session(Some(session), AuthEvent::SignedIn)
            .await;
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), DirectoryError> {
        self.directory.ensure_available()?;
        self.replace_session(None, AuthEvent::SignedOut).await;
        Ok(())
    }

    async fn reset_password_for_email(&self, email: &Email) -> Result<(), DirectoryError> {
        self.directory.ensure_available()?;
        let mut store = self.directory.inner.store.lock().await;
        if store.account_by_email(email).is_some() {
            store.recovery_outbox.push(email.clone());
        }
        Ok(())
    }

    async fn update_password(&self, password: &SecretString) -> Result<(), DirectoryError> {
        self.directory.ensure_available()?;
        let password_hash = hash_password(password.expose_secret())?;
        let session = {
            let (requester, mut store) = self.requester().await;
            let Requester::Account { id, .. } = requester else {
                return Err(DirectoryError::NotAuthenticated);
            };
            let account = store
                .accounts
                .get_mut(&id)
                .ok_or(DirectoryError::NotFound)?;
            account.password_hash = password_hash;
            drop(store);
            self.current_session().await
        };

        let _ = self.events.send(AuthChange {
            event: AuthEvent::UserUpdated,
            session,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    async fn select(&self, query: &TableQuery) -> Result<Vec<Record>, DirectoryError> {
        self.directory.ensure_available()?;
        let (requester, store) = self.requester().await;
        let rows = store
            .rows(query.name())
            .iter()
            .filter(|row| query.matches(row) && can_read(requester, query.name(), row))
            .cloned()
            .collect();
        Ok(query.finish(rows))
    }

    async fn count(&self, query: &TableQuery) -> Result<u64, DirectoryError> {
        self.directory.ensure_available()?;
        let (requester, store) = self.requester().await;
        let aggregate = requester != Requester::Anonymous
            && [tables::USER_PROFILES, tables::WAITLIST_USERS].contains(&query.name());
        let count = store
            .rows(query.name())
            .iter()
            .filter(|row| query.matches(row) && (aggregate || can_read(requester, query.name(), row)))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn insert(&self, table: &str, mut record: Record) -> Result<Record, DirectoryError> {
        self.directory.ensure_available()?;
        let (requester, mut store) = self.requester().await;
        check_insert(requester, table)?;

        if tables::ACCOUNT_SCOPED.contains(&table) {
            let id = row_id(&record)
                .ok_or_else(|| DirectoryError::Rejected(format!("{table} rows need an id")))?;
            if store.rows(table).iter().any(|row| row_id(row) == Some(id)) {
                return Err(DirectoryError::Rejected(format!(
                    "duplicate key in {table}: {id}"
                )));
            }
        } else {
            record
                .entry("id")
                .or_insert_with(|| json!(Uuid::new_v4()));
        }
        record
            .entry("created_at")
            .or_insert_with(|| json!(Utc::now()));

        store.table_mut(table).push(record.clone());
        Ok(record)
    }

    async fn update(&self, query: &TableQuery, patch: Record) -> Result<Vec<Record>, DirectoryError> {
        self.directory.ensure_available()?;
        let (requester, mut store) = self.requester().await;
        let table = query.name();

        // Refuse the whole update if any visible target row is not writable.
        for row in store
            .rows(table)
            .iter()
            .filter(|row| query.matches(row) && can_read(requester, table, row))
        {
            check_write(requester, table, row, &patch)?;
        }

        let now = json!(Utc::now());
        let mut updated = Vec::new();
        for row in store
            .table_mut(table)
            .iter_mut()
            .filter(|row| query.matches(row) && can_read(requester, table, row))
        {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            if row.contains_key("updated_at") {
                row.insert("updated_at".to_owned(), now.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, query: &TableQuery) -> Result<u64, DirectoryError> {
        self.directory.ensure_available()?;
        let (requester, mut store) = self.requester().await;
        requester.require_admin(query.name())?;

        let rows = store.table_mut(query.name());
        let before = rows.len();
        rows.retain(|row| !query.matches(row));
        Ok(u64::try_from(before - rows.len()).unwrap_or(u64::MAX))
    }

    async fn delete_account(&self, user_id: UserId) -> Result<(), DirectoryError> {
        self.directory.ensure_available()?;
        let (requester, mut store) = self.requester().await;
        requester.require_admin("accounts")?;

        store
            .accounts
            .remove(&user_id)
            .ok_or(DirectoryError::NotFound)?;
        for table in tables::ACCOUNT_SCOPED {
            store
                .table_mut(table)
                .retain(|row| row_id(row) != Some(user_id));
        }
        store.sessions.retain(|_, owner| *owner != user_id);
        Ok(())
    }
}
