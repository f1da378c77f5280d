//! Launchpad identity library.
//!
//! Owns who a user is, which role they hold, how that role gates access to
//! the console, and how the first-come waitlist is ranked and exposed back to
//! each account.
//!
//! # Layers
//!
//! - [`directory`] - Account Directory contract and the in-process directory
//! - [`db`] - Typed repositories over the directory's record collections
//! - [`services`] - Role-gated identity operations
//! - [`session`] - Per-tab session context (current identity bundle)
//! - [`gate`] - View authorization decisions
//! - [`waitlist`] - Position display and wait estimates
//! - [`boards`] - Admin dashboards over accounts and the waitlist
//!
//! # Security
//!
//! Role checks in this crate are a convenience layer. The directory's
//! row-scoped policies are the enforcement boundary; every admin-only
//! operation here re-checks the caller's role before issuing a request, and
//! the directory checks again.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod boards;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod gate;
pub mod models;
pub mod services;
pub mod session;
pub mod waitlist;

pub use boards::{AccountsBoard, Notice, WaitlistBoard};
pub use config::{ConfigError, IdentityConfig};
pub use directory::{AccountDirectory, DirectoryClient, DirectoryError, MemoryDirectory};
pub use error::Outcome;
pub use gate::{AuthorizationGate, GateDecision, Requirement};
pub use services::{Caller, IdentityError, IdentityService, RoleCounts};
pub use session::{Phase, SessionContext, SessionState, SessionStatus};
pub use waitlist::{WaitEstimate, WaitlistStanding};
