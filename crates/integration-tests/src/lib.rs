//! Integration tests for Launchpad.
//!
//! Every test runs against an in-process directory, so no external services
//! are needed:
//!
//! ```bash
//! cargo test -p launchpad-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_lifecycle` - Sign-in, sign-out, sign-up and refresh through the
//!   session context
//! - `waitlist_scenarios` - Standing, approval and ordering on the waitlist
//! - `role_gating` - Admin-only operations and the authorization gate

use std::sync::Arc;

use launchpad_core::{Email, Role, UserId};
use launchpad_identity::directory::Provision;
use launchpad_identity::{
    DirectoryClient, IdentityConfig, MemoryDirectory, Phase, SessionContext, SessionState,
};

/// Password given to every provisioned account.
pub const PASSWORD: &str = "correct-horse";

/// Parse a known-good address.
#[must_use]
pub fn email(address: &str) -> Email {
    Email::parse(address).expect("test address should be valid")
}

/// Create an account with `role`, bypassing sign-up.
pub async fn provision(directory: &MemoryDirectory, address: &str, role: Role) -> UserId {
    directory
        .provision(Provision::new(email(address), PASSWORD, role))
        .await
        .expect("Failed to provision account")
}

/// Create `count` waitlisted accounts named `{prefix}{n}@example.com`, in
/// position order.
pub async fn provision_waitlist(
    directory: &MemoryDirectory,
    prefix: &str,
    count: u32,
) -> Vec<UserId> {
    let mut ids = Vec::new();
    for n in 1..=count {
        ids.push(provision(directory, &format!("{prefix}{n}@example.com"), Role::Waitlist).await);
    }
    ids
}

/// A fresh, initialized context on its own client.
pub async fn open_context(directory: &MemoryDirectory) -> Arc<SessionContext<DirectoryClient>> {
    let context = SessionContext::new(Arc::new(directory.client()), IdentityConfig::default());
    context.initialize().await;
    context
}

/// Wait until the context has applied a signed-in session.
pub async fn wait_signed_in(context: &SessionContext<DirectoryClient>) -> SessionState {
    context
        .wait_for(|s| s.phase == Phase::Ready && s.user().is_some())
        .await
}

/// Wait until the context has applied a signed-out session.
pub async fn wait_signed_out(context: &SessionContext<DirectoryClient>) -> SessionState {
    context
        .wait_for(|s| s.phase == Phase::Ready && s.user().is_none())
        .await
}

/// A context signed in as `address` with its identity loaded.
pub async fn signed_in(
    directory: &MemoryDirectory,
    address: &str,
) -> Arc<SessionContext<DirectoryClient>> {
    let context = open_context(directory).await;
    context
        .sign_in(address, PASSWORD)
        .await
        .expect("Failed to sign in");
    wait_signed_in(&context).await;
    context
}
