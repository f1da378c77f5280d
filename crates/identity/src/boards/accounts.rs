//! Admin accounts board.

use std::sync::Arc;

use launchpad_core::{Role, UserId};

use super::Notice;
use crate::directory::AccountDirectory;
use crate::models::Profile;
use crate::services::{IdentityError, RoleCounts};
use crate::session::SessionContext;

/// Every profile plus per-role counts.
pub struct AccountsBoard<D> {
    context: Arc<SessionContext<D>>,
    profiles: Option<Vec<Profile>>,
    counts: Option<RoleCounts>,
    loading: bool,
    notice: Option<Notice>,
}

impl<D: AccountDirectory + 'static> AccountsBoard<D> {
    #[must_use]
    pub const fn new(context: Arc<SessionContext<D>>) -> Self {
        Self {
            context,
            profiles: None,
            counts: None,
            loading: false,
            notice: None,
        }
    }

    /// Profiles from the last load, newest first; `None` before the first load.
    #[must_use]
    pub fn profiles(&self) -> Option<&[Profile]> {
        self.profiles.as_deref()
    }

    #[must_use]
    pub const fn counts(&self) -> Option<RoleCounts> {
        self.counts
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Reload profiles and counts.
    pub async fn reload(&mut self) -> bool {
        self.loading = true;
        let service = self.context.identity_service();
        let profiles = service.list_all_profiles().await;
        let counts = service.count_by_role().await;
        self.loading = false;

        let error = profiles.as_ref().err().or_else(|| counts.as_ref().err());
        if let Some(e) = error {
            self.notice = Some(Notice::error(e));
        }
        let ok = error.is_none();
        self.profiles = Some(profiles.unwrap_or_default());
        self.counts = Some(counts.unwrap_or_default());
        ok
    }

    pub async fn set_role(&mut self, user_id: UserId, role: Role) -> bool {
        let result = self
            .context
            .identity_service()
            .update_role(user_id, role)
            .await;
        self.finish(result, format!("Role changed to {role}")).await
    }

    pub async fn remove(&mut self, user_id: UserId) -> bool {
        let result = self
            .context
            .identity_service()
            .delete_account(user_id)
            .await;
        self.finish(result, "Account removed".to_string()).await
    }

    async fn finish<T>(&mut self, result: Result<T, IdentityError>, success: String) -> bool {
        let ok = result.is_ok();
        self.notice = Some(match result {
            Ok(_) => Notice::success(success),
            Err(e) => Notice::error(&e),
        });
        self.reload().await && ok
    }
}
