//! Launchpad Core - Shared types library.
//!
//! This crate provides the types shared by every Launchpad component:
//! - `identity` - Account directory contract, identity service, session context
//! - `cli` - Operator console for role and waitlist management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no directory access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for account IDs and emails, plus the role,
//!   priority and capability enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
