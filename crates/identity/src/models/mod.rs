//! Domain models for the identity core.
//!
//! These are validated domain objects, separate from the directory record
//! shapes in [`crate::db`].

pub mod admin_grant;
pub mod identity;
pub mod profile;
pub mod session;
pub mod waitlist_entry;

pub use admin_grant::AdminGrant;
pub use identity::{Access, Identity};
pub use profile::{Profile, ProfilePatch, SignUpData};
pub use session::{AccountIdentity, AuthChange, AuthEvent, Session};
pub use waitlist_entry::{WaitlistEntry, WaitlistListing};
