//! Authorization gate for protected views.
//!
//! The gate decides from the in-memory [`SessionState`] alone; it never
//! re-fetches. It only keeps privileged UI from rendering. Admin operations
//! re-check the caller's role in the identity service, and the directory's
//! row policies check it again.

use crate::config::IdentityConfig;
use crate::session::{Phase, SessionState};

/// What a protected view needs from the current account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Any signed-in account.
    SignedIn,
    /// A signed-in account whose profile role is admin.
    Admin,
}

/// Outcome of evaluating the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The session is still loading; show a neutral placeholder.
    Wait,
    /// Render the protected view.
    Render,
    /// Send the visitor to sign in, then back to `return_to`.
    RedirectToLogin { return_to: String },
    /// Signed in but lacking the required role.
    RedirectHome,
}

/// Gate evaluated per protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGate {
    login_path: String,
    home_path: String,
}

impl Default for AuthorizationGate {
    fn default() -> Self {
        Self::from_config(&IdentityConfig::default())
    }
}

impl AuthorizationGate {
    #[must_use]
    pub fn new(login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            home_path: home_path.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(config.login_path.clone(), config.home_path.clone())
    }

    /// Decide whether the view at `requested` may render.
    #[must_use]
    pub fn evaluate(
        &self,
        state: &SessionState,
        requirement: Requirement,
        requested: &str,
    ) -> GateDecision {
        if state.phase != Phase::Ready {
            return GateDecision::Wait;
        }
        if state.user().is_none() {
            return GateDecision::RedirectToLogin {
                return_to: requested.to_string(),
            };
        }
        if requirement == Requirement::Admin && !state.is_admin() {
            return GateDecision::RedirectHome;
        }
        GateDecision::Render
    }

    /// Where a redirecting decision sends the visitor.
    ///
    /// The sign-in location carries the requested path as `redirect`.
    #[must_use]
    pub fn redirect_location(&self, decision: &GateDecision) -> Option<String> {
        match decision {
            GateDecision::RedirectToLogin { return_to } => Some(format!(
                "{}?redirect={}",
                self.login_path,
                urlencoding::encode(return_to)
            )),
            GateDecision::RedirectHome => Some(self.home_path.clone()),
            GateDecision::Wait | GateDecision::Render => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use launchpad_core::{Email, Role, UserId};
    use secrecy::SecretString;

    use super::*;
    use crate::models::{AccountIdentity, Identity, Profile, Session};

    fn state(phase: Phase, role: Option<Role>, signed_in: bool) -> SessionState {
        let id = UserId::random();
        let email = Email::parse("someone@example.com").unwrap();
        let now = Utc::now();
        let session = signed_in.then(|| Session {
            user: Some(AccountIdentity {
                id,
                email: email.clone(),
                created_at: now,
                last_sign_in_at: None,
                metadata: serde_json::Value::Null,
            }),
            access_token: SecretString::from("token".to_owned()),
        });
        let identity = role.map(|role| {
            Identity::assemble(
                Profile {
                    id,
                    email: email.clone(),
                    full_name: None,
                    company: None,
                    position: None,
                    phone: None,
                    avatar_url: None,
                    role,
                    is_active: true,
                    last_login_at: None,
                    created_at: now,
                    updated_at: now,
                },
                None,
                None,
            )
        });
        SessionState {
            phase,
            session,
            identity,
        }
    }

    #[test]
    fn test_waits_while_loading() {
        let gate = AuthorizationGate::default();
        for phase in [Phase::Uninitialized, Phase::Loading] {
            let decision = gate.evaluate(&state(phase, None, false), Requirement::Admin, "/admin");
            assert_eq!(decision, GateDecision::Wait);
        }
    }

    #[test]
    fn test_anonymous_redirects_to_login_with_return() {
        let gate = AuthorizationGate::default();
        let decision = gate.evaluate(
            &state(Phase::Ready, None, false),
            Requirement::SignedIn,
            "/dashboard?tab=waitlist",
        );
        assert_eq!(
            decision,
            GateDecision::RedirectToLogin {
                return_to: "/dashboard?tab=waitlist".to_string()
            }
        );
        assert_eq!(
            gate.redirect_location(&decision).unwrap(),
            "/login?redirect=%2Fdashboard%3Ftab%3Dwaitlist"
        );
    }

    #[test]
    fn test_non_admin_redirects_home() {
        let gate = AuthorizationGate::new("/auth/login", "/home");
        for role in [Some(Role::Waitlist), Some(Role::User), None] {
            let decision = gate.evaluate(&state(Phase::Ready, role, true), Requirement::Admin, "/admin");
            assert_eq!(decision, GateDecision::RedirectHome);
            assert_eq!(gate.redirect_location(&decision).as_deref(), Some("/home"));
        }
    }

    #[test]
    fn test_renders() {
        let gate = AuthorizationGate::default();
        let admin = state(Phase::Ready, Some(Role::Admin), true);
        assert_eq!(
            gate.evaluate(&admin, Requirement::Admin, "/admin"),
            GateDecision::Render
        );
        let waitlisted = state(Phase::Ready, Some(Role::Waitlist), true);
        assert_eq!(
            gate.evaluate(&waitlisted, Requirement::SignedIn, "/dashboard"),
            GateDecision::Render
        );
        assert!(gate.redirect_location(&GateDecision::Render).is_none());
    }
}
