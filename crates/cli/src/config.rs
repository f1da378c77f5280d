//! Operator console configuration.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LAUNCHPAD_DIRECTORY_FILE` - Directory snapshot path (unless `--directory` is given)
//! - `LAUNCHPAD_OPERATOR_EMAIL` - Admin account the console signs in as
//! - `LAUNCHPAD_OPERATOR_PASSWORD` - Password for the operator account
//!
//! Everything [`IdentityConfig`] reads is honored as well.

use std::fmt;
use std::path::PathBuf;

use secrecy::SecretString;

use launchpad_identity::{ConfigError, IdentityConfig};

/// Console configuration.
#[derive(Clone)]
pub struct CliConfig {
    pub directory_file: PathBuf,
    pub operator_email: String,
    pub operator_password: SecretString,
    pub identity: IdentityConfig,
}

impl fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliConfig")
            .field("directory_file", &self.directory_file)
            .field("operator_email", &self.operator_email)
            .field("operator_password", &"[REDACTED]")
            .field("identity", &self.identity)
            .finish()
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// `directory` overrides `LAUNCHPAD_DIRECTORY_FILE`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if a required variable is unset.
    pub fn from_env(directory: Option<PathBuf>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(directory, |key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if a required variable is unset.
    pub fn from_lookup(
        directory: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            directory_file: directory_file(directory, &lookup)?,
            operator_email: get_required(&lookup, "LAUNCHPAD_OPERATOR_EMAIL")?,
            operator_password: SecretString::from(get_required(
                &lookup,
                "LAUNCHPAD_OPERATOR_PASSWORD",
            )?),
            identity: IdentityConfig::from_lookup(&lookup)?,
        })
    }
}

/// Resolve the snapshot path: `directory` if given, else
/// `LAUNCHPAD_DIRECTORY_FILE`.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither is set.
pub fn directory_file(
    directory: Option<PathBuf>,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, ConfigError> {
    match directory {
        Some(path) => Ok(path),
        None => get_required(lookup, "LAUNCHPAD_DIRECTORY_FILE").map(PathBuf::from),
    }
}

fn get_required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}
