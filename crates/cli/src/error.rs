//! Console errors.

use thiserror::Error;

use launchpad_identity::{ConfigError, DirectoryError, GateDecision, IdentityError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed directory snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Malformed seed file: {0}")]
    Seed(#[from] serde_yaml::Error),

    #[error("{0} seed validation errors found")]
    SeedValidation(usize),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The operator account did not pass the admin gate.
    #[error("Operator is not an admin ({0:?})")]
    Forbidden(GateDecision),

    #[error("No account with email {0}")]
    UnknownAccount(String),

    #[error("{0} is not on the waitlist")]
    NotWaitlisted(String),

    /// A board action failed; carries the board's notice text.
    #[error("{0}")]
    Action(String),
}

impl CliError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
