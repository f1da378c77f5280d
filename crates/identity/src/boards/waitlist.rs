//! Admin waitlist board.

use std::sync::Arc;

use tracing::debug;

use launchpad_core::{PriorityLevel, Role, UserId};

use super::Notice;
use crate::directory::AccountDirectory;
use crate::error::Outcome;
use crate::models::WaitlistListing;
use crate::services::IdentityError;
use crate::session::SessionContext;

/// Waitlist table ordered by position, with inline admin actions.
///
/// Every action is followed by a full reload rather than a local patch, so
/// the board never drifts from the directory.
pub struct WaitlistBoard<D> {
    context: Arc<SessionContext<D>>,
    rows: Option<Vec<WaitlistListing>>,
    loading: bool,
    notice: Option<Notice>,
}

impl<D: AccountDirectory + 'static> WaitlistBoard<D> {
    #[must_use]
    pub const fn new(context: Arc<SessionContext<D>>) -> Self {
        Self {
            context,
            rows: None,
            loading: false,
            notice: None,
        }
    }

    /// Rows from the last load; `None` until the first load finishes.
    #[must_use]
    pub fn rows(&self) -> Option<&[WaitlistListing]> {
        self.rows.as_deref()
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

    /// Reload every row. A failed load leaves an empty table and an error
    /// notice.
    pub async fn reload(&mut self) -> bool {
        self.loading = true;
        let outcome: Outcome<Vec<WaitlistListing>> = self
            .context
            .identity_service()
            .list_all_waitlist_entries()
            .await
            .into();
        self.loading = false;

        if let Some(error) = &outcome.error {
            self.notice = Some(Notice::error(error));
        }
        let ok = outcome.is_ok();
        let rows = outcome.data_or_default();
        debug!(rows = rows.len(), "Waitlist board reloaded");
        self.rows = Some(rows);
        ok
    }

    /// Give an entry a new position. Other entries keep theirs.
    pub async fn reposition(&mut self, user_id: UserId, position: u32) -> bool {
        let result = self
            .context
            .identity_service()
            .update_waitlist_position(user_id, position)
            .await;
        self.finish(result, format!("Moved to position {position}"))
            .await
    }

    pub async fn set_priority(&mut self, user_id: UserId, priority: PriorityLevel) -> bool {
        let result = self
            .context
            .identity_service()
            .update_waitlist_priority(user_id, priority)
            .await;
        self.finish(result, format!("Priority set to {priority}"))
            .await
    }

    /// Admit an account by changing its role to `user`.
    pub async fn approve(&mut self, user_id: UserId) -> bool {
        let result = self
            .context
            .identity_service()
            .update_role(user_id, Role::User)
            .await;
        self.finish(result, "Account approved".to_string()).await
    }

    /// Delete an account entirely.
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
