//! Waitlist ranking: estimates and self-service standing.

pub mod estimate;
pub mod standing;

pub use estimate::{WaitEstimate, estimated_weeks, progress};
pub use standing::WaitlistStanding;
