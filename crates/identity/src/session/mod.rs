//! Session context.
//!
//! One [`SessionContext`] per runtime instance owns the current identity
//! bundle. It hydrates from the directory's existing session on
//! [`initialize`](SessionContext::initialize), then follows the directory's
//! auth-event stream; there is no polling. Readers get snapshots or a
//! `watch` receiver, never a handle on the mutable state.
//!
//! Auth events are applied in emission order and always replace the session;
//! each one starts a new epoch. A `refresh_profile` load carries the epoch and
//! generation it started under and is discarded if an auth event or a newer
//! refresh has begun since, so racing refreshes settle on the newest request
//! and never overwrite an event.

mod state;

pub use state::{Phase, SessionState, SessionStatus};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use launchpad_core::{Email, UserId};

use crate::config::IdentityConfig;
use crate::directory::AccountDirectory;
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{
    AccountIdentity, AuthChange, AuthEvent, Identity, Profile, ProfilePatch, Session, SignUpData,
};
use crate::services::{Caller, IdentityError, IdentityService};

/// Per-instance owner of the current identity.
pub struct SessionContext<D> {
    directory: Arc<D>,
    config: IdentityConfig,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
    generation: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<D> std::fmt::Debug for SessionContext<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("status", &self.state.borrow().status())
            .field("epoch", &self.epoch.load(Ordering::SeqCst))
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<D: AccountDirectory + 'static> SessionContext<D> {
    /// Create an uninitialized context over a directory client.
    #[must_use]
    pub fn new(directory: Arc<D>, config: IdentityConfig) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        Arc::new(Self {
            directory,
            config,
            state,
            epoch: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            listener: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn directory(&self) -> &D {
        &self.directory
    }

    #[must_use]
    pub const fn config(&self) -> &IdentityConfig {
        &self.config
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribe to auth events and load the existing session, if any.
    ///
    /// Runs once; later calls return immediately. Directory failures are
    /// logged and leave the context ready and anonymous.
    #[instrument(skip(self))]
    pub async fn initialize(self: &Arc<Self>) {
        let started = self.state.send_if_modified(|state| {
            if state.phase == Phase::Uninitialized {
                state.phase = Phase::Loading;
                true
            } else {
                false
            }
        });
        if !started {
            return;
        }

        let events = self.directory.subscribe();
        let handle = tokio::spawn(listen(Arc::downgrade(self), events));
        if let Ok(mut listener) = self.listener.lock() {
            *listener = Some(handle);
        }

        let session = match self.directory.get_session().await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Could not load existing session");
                None
            }
        };
        self.apply_session(session).await;
    }

    /// Apply an auth-state change pushed by the directory.
    ///
    /// This is the only path that changes the signed-in account after
    /// startup.
    #[instrument(skip(self, session))]
    pub async fn on_auth_event(&self, event: AuthEvent, session: Option<Session>) {
        debug!(signed_in = session.as_ref().is_some_and(|s| s.user.is_some()), "Auth event");
        self.apply_session(session).await;
    }

    /// Stop following auth events.
    pub fn shutdown(&self) {
        abort_listener(&self.listener);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Wait until `predicate` holds for the current state.
    pub async fn wait_for(&self, mut predicate: impl FnMut(&SessionState) -> bool) -> SessionState {
        let mut receiver = self.watch();
        match receiver.wait_for(|state| predicate(state)).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Wait until the first load has completed.
    pub async fn wait_until_ready(&self) -> SessionState {
        self.wait_for(|state| state.phase == Phase::Ready).await
    }

    /// An identity service acting as the current account.
    #[must_use]
    pub fn identity_service(&self) -> IdentityService<'_, D> {
        IdentityService::new(self.directory.as_ref(), self.snapshot().caller())
    }

    // =========================================================================
    // Auth flows
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// State updates when the resulting auth event is applied, not when this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Invalid` for a malformed email or empty
    /// password, `IdentityError::Rejected` for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), IdentityError> {
        let email = parse_email(email)?;
        if password.is_empty() {
            return Err(IdentityError::Invalid("Password is required".to_string()));
        }

        let session = self
            .directory
            .sign_in_with_password(&email, &SecretString::from(password.to_owned()))
            .await?;

        if let Some(user_id) = session.user_id() {
            IdentityService::new(self.directory.as_ref(), Some(Caller::new(user_id, None)))
                .record_login(user_id)
                .await;
            info!(user_id = %user_id, "Signed in");
        }
        Ok(())
    }

    /// Create an account. New accounts join the waitlist.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Invalid` if the email is malformed, the
    /// password is too short or the confirmation differs; these are checked
    /// before any directory call. Returns `IdentityError::Rejected` if the
    /// email is already registered.
    #[instrument(skip(self, data))]
    pub async fn sign_up(&self, data: SignUpData) -> Result<AccountIdentity, IdentityError> {
        let email = parse_email(&data.email)?;
        self.validate_new_password(&data.password, &data.confirm_password)?;

        let user = self
            .directory
            .sign_up(&email, &data.password, data.metadata())
            .await?;
        info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::DirectoryUnavailable` if the directory is down.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), IdentityError> {
        self.directory.sign_out().await?;
        Ok(())
    }

    /// Request a password reset email.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Invalid` for a malformed email.
    #[instrument(skip(self))]
    pub async fn reset_password(&self, email: &str) -> Result<(), IdentityError> {
        let email = parse_email(email)?;
        self.directory.reset_password_for_email(&email).await?;
        Ok(())
    }

    /// Change the signed-in account's password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Invalid` if the password is too short or the
    /// confirmation differs. Returns `IdentityError::Unauthorized` when
    /// signed out.
    #[instrument(skip(self, password, confirmation))]
    pub async fn update_password(
        &self,
        password: &str,
        confirmation: &str,
    ) -> Result<(), IdentityError> {
        let password = SecretString::from(password.to_owned());
        let confirmation = SecretString::from(confirmation.to_owned());
        self.validate_new_password(&password, &confirmation)?;

        self.directory.update_password(&password).await?;
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Update the current account's display attributes and reload the
    /// identity. Profile edits emit no auth event, so the reload is explicit.
    ///
    /// A failed reload is logged; the saved profile is still returned.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Unauthorized` when signed out.
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Profile, IdentityError> {
        let profile = self.identity_service().update_profile(patch).await?;
        if let Err(e) = self.refresh_profile().await {
            warn!(user_id = %profile.id, error = %e, "Profile saved but reload failed");
        }
        Ok(profile)
    }

    /// Reload the profile and role payload for the current account.
    ///
    /// No-op when signed out. On failure the previous identity is kept.
    ///
    /// # Errors
    ///
    /// Returns the directory failure, if any.
    #[instrument(skip(self))]
    pub async fn refresh_profile(&self) -> Result<(), IdentityError> {
        let Some(user_id) = self.snapshot().user_id() else {
            return Ok(());
        };
        let epoch = self.epoch.load(Ordering::SeqCst);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let identity = self.load_identity(user_id).await?;

        self.state.send_if_modified(|state| {
            let current = self.epoch.load(Ordering::SeqCst) == epoch
                && self.generation.load(Ordering::SeqCst) == generation
                && state.user_id() == Some(user_id);
            if current {
                state.identity = identity;
            } else {
                debug!(generation, "Discarding stale profile refresh");
            }
            current
        });
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn validate_new_password(
        &self,
        password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<(), IdentityError> {
        let min = self.config.min_password_length;
        if password.expose_secret().chars().count() < min {
            return Err(IdentityError::Invalid(format!(
                "Password must be at least {min} characters"
            )));
        }
        if password.expose_secret() != confirmation.expose_secret() {
            return Err(IdentityError::Invalid("Passwords do not match".to_string()));
        }
        Ok(())
    }

    async fn load_identity(&self, user_id: UserId) -> Result<Option<Identity>, IdentityError> {
        IdentityService::new(self.directory.as_ref(), Some(Caller::new(user_id, None)))
            .load_identity(user_id)
            .await
    }

    /// Replace the session and load the identity that goes with it.
    ///
    /// Only a newer auth event can supersede this one.
    async fn apply_session(&self, session: Option<Session>) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let identity = match session.as_ref().and_then(Session::user_id) {
            None => None,
            Some(user_id) => match self.load_identity(user_id).await {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Could not load profile");
                    None
                }
            },
        };

        let committed = self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!(epoch, "Discarding superseded auth event");
                return false;
            }
            state.phase = Phase::Ready;
            state.session = session;
            state.identity = identity;
            true
        });
        if committed {
            self.sync_sentry_user();
        }
    }

    /// Reload the session after missed auth events. An unreachable directory
    /// leaves the current state alone.
    async fn resync(&self) {
        match self.directory.get_session().await {
            Ok(session) => self.apply_session(session).await,
            Err(e) => warn!(error = %e, "Could not resync session; keeping current state"),
        }
    }

    fn sync_sentry_user(&self) {
        let state = self.snapshot();
        match state.user() {
            Some(user) => set_sentry_user(&user.id, Some(user.email.as_str())),
            None => clear_sentry_user(),
        }
    }
}

impl<D> Drop for SessionContext<D> {
    fn drop(&mut self) {
        abort_listener(&self.listener);
    }
}

fn abort_listener(listener: &Mutex<Option<JoinHandle<()>>>) {
    let handle = listener.lock().ok().and_then(|mut guard| guard.take());
    if let Some(handle) = handle {
        handle.abort();
    }
}

/// Apply auth events in emission order until the context or the stream ends.
async fn listen<D: AccountDirectory + 'static>(
    context: Weak<SessionContext<D>>,
    mut events: broadcast::Receiver<AuthChange>,
) {
    loop {
        match events.recv().await {
            Ok(change) => {
                let Some(context) = context.upgrade() else {
                    break;
                };
                context.on_auth_event(change.event, change.session).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Auth events dropped; resyncing session");
                let Some(context) = context.upgrade() else {
                    break;
                };
                context.resync().await;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn parse_email(raw: &str) -> Result<Email, IdentityError> {
    Email::parse(raw).map_err(|e| IdentityError::Invalid(format!("Invalid email: {e}")))
}
