//! Self-service waitlist standing.

use serde::Serialize;

use launchpad_core::PriorityLevel;

use super::estimate::{WaitEstimate, estimated_weeks, progress};
use crate::directory::AccountDirectory;
use crate::models::WaitlistEntry;
use crate::services::IdentityError;
use crate::session::SessionContext;

/// A waitlisted account's place in line, as shown to that account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitlistStanding {
    pub position: u32,
    pub priority_level: PriorityLevel,
    /// Current waitlist size.
    pub total: u64,
    /// `position / total`, clamped to `[0, 1]`.
    pub progress: f64,
    pub estimate: WaitEstimate,
    pub estimated_weeks: u32,
}

impl WaitlistStanding {
    #[must_use]
    pub fn from_entry(entry: &WaitlistEntry, total: u64, per_week: u32) -> Self {
        Self {
            position: entry.position,
            priority_level: entry.priority_level,
            total,
            progress: progress(entry.position, total),
            estimate: WaitEstimate::for_position(entry.position, per_week),
            estimated_weeks: estimated_weeks(entry.position, per_week),
        }
    }

    /// Progress as a whole percentage.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn progress_percent(&self) -> u8 {
        (self.progress * 100.0).round() as u8
    }

    /// Standing of the account signed in to `context`.
    ///
    /// Returns `Ok(None)` unless the current identity is waitlisted with a
    /// provisioned entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the waitlist size cannot be read.
    pub async fn current<D: AccountDirectory + 'static>(
        context: &SessionContext<D>,
    ) -> Result<Option<Self>, IdentityError> {
        let state = context.snapshot();
        let Some(entry) = state.waitlist_entry() else {
            return Ok(None);
        };
        let total = context.identity_service().waitlist_size().await?;
        Ok(Some(Self::from_entry(
            entry,
            total,
            context.config().admissions_per_week,
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use launchpad_core::UserId;

    use super::*;

    fn entry(position: u32) -> WaitlistEntry {
        WaitlistEntry {
            id: UserId::random(),
            position,
            priority_level: PriorityLevel::High,
            expected_access_date: None,
            referral_source: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_position_seven_of_fifty() {
        let standing = WaitlistStanding::from_entry(&entry(7), 50, 10);
        assert!((standing.progress - 0.14).abs() < 1e-9);
        assert_eq!(standing.progress_percent(), 14);
        assert_eq!(standing.estimated_weeks, 1);
        assert_eq!(standing.priority_level, PriorityLevel::High);
    }

    #[test]
    fn test_position_past_total_is_clamped() {
        let standing = WaitlistStanding::from_entry(&entry(75), 50, 10);
        assert!((standing.progress - 1.0).abs() < f64::EPSILON);
        assert_eq!(standing.progress_percent(), 100);
        assert_eq!(standing.estimate, WaitEstimate::Months(2));
    }
}
