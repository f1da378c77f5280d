//! Waitlist entry domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use launchpad_core::{Email, PriorityLevel, UserId};

/// A waitlisted account's place in line.
///
/// Only meaningful while the owning profile's role is `waitlist`. Lower
/// positions are earlier in line; positions may have gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistEntry {
    /// Owning account (same as the profile ID).
    pub id: UserId,
    /// Place in line, starting at 1.
    pub position: u32,
    pub priority_level: PriorityLevel,
    pub expected_access_date: Option<NaiveDate>,
    pub referral_source: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A waitlist entry joined with its owner's display fields, for admin tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistListing {
    pub entry: WaitlistEntry,
    pub email: Email,
    pub full_name: Option<String>,
    pub company: Option<String>,
}

impl WaitlistListing {
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.entry.id
    }

    #[must_use]
    pub const fn position(&self) -> u32 {
        self.entry.position
    }
}
