//! UI-facing result shape and Sentry helpers.
//!
//! Identity and session operations return `Result`. Surfaces that render
//! inline messages convert those into an [`Outcome`], which never carries a
//! partial payload alongside an error.

use std::fmt::Display;

use serde::Serialize;

/// `{ data, error }` result for UI consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    /// Whether the operation succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The payload, or `T::default()` on failure.
    ///
    /// A failed `list_all_profiles` becomes `([], Some(error))`.
    #[must_use]
    pub fn data_or_default(self) -> T
    where
        T: Default,
    {
        self.data.unwrap_or_default()
    }
}

impl<T, E: Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                error: None,
            },
            Err(e) => Self {
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this when an identity is loaded to associate errors with the account.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context (e.g., on sign-out).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for debugging context.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_list_yields_empty_and_message() {
        let result: Result<Vec<u32>, &str> = Err("Unauthorized: admin role required");
        let outcome = Outcome::from(result);
        assert!(!outcome.is_ok());
        assert_eq!(
            outcome.error.as_deref(),
            Some("Unauthorized: admin role required")
        );
        assert!(outcome.data_or_default().is_empty());
    }

    #[test]
    fn test_success() {
        let outcome = Outcome::from(Ok::<_, String>(3));
        assert!(outcome.is_ok());
        assert_eq!(outcome.data, Some(3));
    }
}
