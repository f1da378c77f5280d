//! Service layer.

pub mod identity;

pub use identity::{Caller, IdentityError, IdentityService, RoleCounts};
