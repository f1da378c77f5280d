//! Account profile domain types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use launchpad_core::{Email, Role, UserId};

use crate::directory::Record;

/// One profile per account.
///
/// `role` is the single source of truth for authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    /// Account ID (stable, shared with the directory account).
    pub id: UserId,
    /// Account email (unique, case-insensitive).
    pub email: Email,
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    /// Authorization role.
    pub role: Role,
    /// Whether the account is active.
    pub is_active: bool,
    /// Last successful sign-in, if any.
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Name to show in the console: full name when set, otherwise the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.email.as_str())
    }
}

/// Self-service edit of the caller's own display attributes.
///
/// `None` leaves a field untouched; `Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

impl ProfilePatch {
    /// Returns `true` if the patch would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.company.is_none()
            && self.position.is_none()
            && self.phone.is_none()
            && self.avatar_url.is_none()
    }

    /// Convert into the column patch sent to the directory.
    #[must_use]
    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        let fields = [
            ("full_name", self.full_name),
            ("company", self.company),
            ("position", self.position),
            ("phone", self.phone),
            ("avatar_url", self.avatar_url),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                let trimmed = value.trim();
                let value = if trimmed.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(trimmed.to_owned())
                };
                record.insert(column.to_owned(), value);
            }
        }
        record
    }
}

/// Input for creating a new account.
#[derive(Debug, Clone)]
pub struct SignUpData {
    pub email: String,
    pub password: SecretString,
    /// Must match `password`; checked before any directory call.
    pub confirm_password: SecretString,
    pub full_name: Option<String>,
    pub company: Option<String>,
    /// Where the account heard about the product.
    pub referral_source: Option<String>,
}

impl SignUpData {
    /// Sign-up data with only the required fields.
    #[must_use]
    pub fn new(email: impl Into<String>, password: &str, confirm_password: &str) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.to_owned()),
            confirm_password: SecretString::from(confirm_password.to_owned()),
            full_name: None,
            company: None,
            referral_source: None,
        }
    }

    /// Metadata forwarded to the directory with the sign-up request.
    #[must_use]
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "full_name": self.full_name,
            "company": self.company,
            "referral_source": self.referral_source,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patch() {
        assert!(ProfilePatch::default().is_empty());
        assert!(ProfilePatch::default().into_record().is_empty());
    }

    #[test]
    fn test_patch_only_sends_touched_fields() {
        let patch = ProfilePatch {
            company: Some("  Initech ".to_owned()),
            ..ProfilePatch::default()
        };
        let record = patch.into_record();
        assert_eq!(record.len(), 1);
        assert_eq!(record["company"], "Initech");
    }

    #[test]
    fn test_patch_blank_clears() {
        let patch = ProfilePatch {
            phone: Some("   ".to_owned()),
            ..ProfilePatch::default()
        };
        assert!(patch.into_record()["phone"].is_null());
    }

    #[test]
    fn test_sign_up_metadata() {
        let mut data = SignUpData::new("a@b.co", "hunter22", "hunter22");
        data.referral_source = Some("podcast".to_owned());
        let meta = data.metadata();
        assert_eq!(meta["referral_source"], "podcast");
        assert!(meta["full_name"].is_null());
    }
}
