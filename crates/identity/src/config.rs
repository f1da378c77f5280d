//! Identity core configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `LAUNCHPAD_MIN_PASSWORD_LENGTH` - Shortest accepted password (default: 6)
//! - `LAUNCHPAD_ADMISSIONS_PER_WEEK` - Waitlist admissions per week used for
//!   wait estimates (default: 10)
//! - `LAUNCHPAD_LOGIN_PATH` - Sign-in location for gate redirects (default: /login)
//! - `LAUNCHPAD_HOME_PATH` - Home location for gate redirects (default: /)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::str::FromStr;

use thiserror::Error;

const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;
const DEFAULT_ADMISSIONS_PER_WEEK: u32 = 10;
const DEFAULT_LOGIN_PATH: &str = "/login";
const DEFAULT_HOME_PATH: &str = "/";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Identity core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Shortest password accepted at sign-up and password change.
    pub min_password_length: usize,
    /// Assumed waitlist admission throughput.
    pub admissions_per_week: u32,
    /// Where the gate sends signed-out visitors.
    pub login_path: String,
    /// Where the gate sends signed-in visitors lacking a role.
    pub home_path: String,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            admissions_per_week: DEFAULT_ADMISSIONS_PER_WEEK,
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            home_path: DEFAULT_HOME_PATH.to_owned(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is set but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let min_password_length = parse_or_default(
            &lookup,
            "LAUNCHPAD_MIN_PASSWORD_LENGTH",
            DEFAULT_MIN_PASSWORD_LENGTH,
        )?;
        if min_password_length == 0 {
            return Err(invalid("LAUNCHPAD_MIN_PASSWORD_LENGTH", "must be at least 1"));
        }

        let admissions_per_week = parse_or_default(
            &lookup,
            "LAUNCHPAD_ADMISSIONS_PER_WEEK",
            DEFAULT_ADMISSIONS_PER_WEEK,
        )?;
        if admissions_per_week == 0 {
            return Err(invalid("LAUNCHPAD_ADMISSIONS_PER_WEEK", "must be at least 1"));
        }

        let login_path = get_path(&lookup, "LAUNCHPAD_LOGIN_PATH", DEFAULT_LOGIN_PATH)?;
        let home_path = get_path(&lookup, "LAUNCHPAD_HOME_PATH", DEFAULT_HOME_PATH)?;

        Ok(Self {
            min_password_length,
            admissions_per_week,
            login_path,
            home_path,
            sentry_dsn: get_optional(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}

fn get_optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_or_default<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional(lookup, key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &e.to_string()))
    })
}

fn get_path(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> Result<String, ConfigError> {
    let path = get_optional(lookup, key).unwrap_or_else(|| default.to_string());
    if path.starts_with('/') {
        Ok(path)
    } else {
        Err(invalid(key, "must start with /"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<IdentityConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        IdentityConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(load(&[]).unwrap(), IdentityConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("LAUNCHPAD_MIN_PASSWORD_LENGTH", "12"),
            ("LAUNCHPAD_ADMISSIONS_PER_WEEK", " 25 "),
            ("LAUNCHPAD_LOGIN_PATH", "/auth/sign-in"),
            ("SENTRY_DSN", "https://key@sentry.invalid/1"),
        ])
        .unwrap();
        assert_eq!(config.min_password_length, 12);
        assert_eq!(config.admissions_per_week, 25);
        assert_eq!(config.login_path, "/auth/sign-in");
        assert_eq!(config.home_path, "/");
        assert!(config.sentry_dsn.is_some());
    }

    #[test]
    fn test_blank_sentry_dsn_is_none() {
        let config = load(&[("SENTRY_DSN", "  ")]).unwrap();
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("LAUNCHPAD_ADMISSIONS_PER_WEEK", "ten")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("LAUNCHPAD_ADMISSIONS_PER_WEEK", "0")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("LAUNCHPAD_LOGIN_PATH", "login")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }
}
