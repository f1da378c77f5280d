//! Seed a directory snapshot with accounts from a YAML file.
//!
//! Seeding writes straight to the directory, bypassing sign-up and row
//! policies, because it is how the first admin account comes to exist.
//!
//! ```yaml
//! accounts:
//!   - email: root@example.com
//!     password: change-me-now
//!     role: admin
//!   - email: early@example.com
//!     password: change-me-too
//!     role: waitlist
//!     full_name: Early Bird
//!     priority: vip
//!     position: 1
//! ```

use std::collections::HashSet;
use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use tracing::{error, info, warn};

use launchpad_core::{Email, PriorityLevel, Role};
use launchpad_identity::DirectoryError;
use launchpad_identity::directory::Provision;

use crate::console::{load_directory, save_directory};
use crate::error::CliError;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub accounts: Vec<SeedAccount>,
}

#[derive(Debug, Deserialize)]
pub struct SeedAccount {
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub full_name: Option<String>,
    pub company: Option<String>,
    pub referral_source: Option<String>,
    #[serde(default)]
    pub priority: PriorityLevel,
    pub position: Option<u32>,
}

const fn default_role() -> Role {
    Role::Waitlist
}

/// Result of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Check a seed file before touching the directory. Returns every problem
/// found.
#[must_use]
pub fn validate_seed(seed: &SeedFile, min_password_length: usize) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, account) in seed.accounts.iter().enumerate() {
        let label = format!("accounts[{index}]");
        match Email::parse(&account.email) {
            Ok(email) => {
                if !seen.insert(email.clone()) {
                    errors.push(format!("{label}: duplicate email {email}"));
                }
            }
            Err(e) => errors.push(format!("{label}: {e}")),
        }
        if account.password.chars().count() < min_password_length {
            errors.push(format!(
                "{label}: password must be at least {min_password_length} characters"
            ));
        }
        if account.position == Some(0) {
            errors.push(format!("{label}: position must be at least 1"));
        }
        if account.role != Role::Waitlist && account.position.is_some() {
            errors.push(format!("{label}: only waitlist accounts take a position"));
        }
    }
    errors
}

/// Seed accounts from a YAML file into the snapshot at `directory_file`.
///
/// Accounts whose email already exists are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, or the
/// snapshot cannot be loaded or saved.
pub async fn accounts(
    file_path: &Path,
    directory_file: &Path,
    min_password_length: usize,
) -> Result<SeedReport, CliError> {
    info!(path = %file_path.display(), "Loading seed accounts from file");
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|e| CliError::io(file_path, e))?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(accounts = seed.accounts.len(), "Parsed seed file");

    let errors = validate_seed(&seed, min_password_length);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CliError::SeedValidation(errors.len()));
    }

    let directory = load_directory(directory_file).await?;
    let mut report = SeedReport::default();

    for account in seed.accounts {
        let email = Email::parse(&account.email).map_err(|e| CliError::Action(e.to_string()))?;
        let provision = Provision {
            email: email.clone(),
            password: SecretString::from(account.password),
            role: account.role,
            full_name: account.full_name,
            company: account.company,
            referral_source: account.referral_source,
            priority: account.priority,
            position: account.position,
        };
        match directory.provision(provision).await {
            Ok(user_id) => {
                info!(%email, %user_id, role = %account.role, "Seeded account");
                report.inserted += 1;
            }
            Err(DirectoryError::AlreadyRegistered) => {
                warn!(%email, "Account already exists; skipped");
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    save_directory(&directory, directory_file).await?;
    info!("Seeding complete!");
    info!("  Accounts inserted: {}", report.inserted);
    info!("  Accounts skipped (already exist): {}", report.skipped);
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEED: &str = r"
accounts:
  - email: Root@Example.com
    password: correct-horse
    role: admin
  - email: early@example.com
    password: correct-horse
    full_name: Early Bird
    priority: vip
    position: 3
";

    #[test]
    fn test_defaults_to_waitlist() {
        let seed: SeedFile = serde_yaml::from_str(SEED).unwrap();
        assert_eq!(seed.accounts[0].role, Role::Admin);
        assert_eq!(seed.accounts[1].role, Role::Waitlist);
        assert_eq!(seed.accounts[1].priority, PriorityLevel::Vip);
        assert!(validate_seed(&seed, 6).is_empty());
    }

    #[test]
    fn test_validation_collects_every_problem() {
        let seed: SeedFile = serde_yaml::from_str(
            r"
accounts:
  - email: a@example.com
    password: short
  - email: A@example.com
    password: long-enough
    position: 0
  - email: not-an-email
    password: long-enough
    role: user
    position: 2
",
        )
        .unwrap();
        let errors = validate_seed(&seed, 6);
        assert_eq!(errors.len(), 5, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("duplicate email")));
    }

    #[tokio::test]
    async fn test_seed_twice_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = dir.path().join("seed.yaml");
        let directory_path = dir.path().join("directory.json");
        tokio::fs::write(&seed_path, SEED).await.unwrap();

        let first = accounts(&seed_path, &directory_path, 6).await.unwrap();
        assert_eq!(first, SeedReport { inserted: 2, skipped: 0 });

        let second = accounts(&seed_path, &directory_path, 6).await.unwrap();
        assert_eq!(second, SeedReport { inserted: 0, skipped: 2 });

        let directory = load_directory(&directory_path).await.unwrap();
        let waitlist = directory.records("waitlist_users").await;
        assert_eq!(waitlist.len(), 1);
        assert_eq!(waitlist[0].get("position").and_then(serde_json::Value::as_u64), Some(3));
    }

    #[tokio::test]
    async fn test_invalid_seed_leaves_directory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = dir.path().join("seed.yaml");
        let directory_path = dir.path().join("directory.json");
        tokio::fs::write(&seed_path, "accounts:\n  - email: x\n    password: y\n")
            .await
            .unwrap();

        let result = accounts(&seed_path, &directory_path, 6).await;
        assert!(matches!(result, Err(CliError::SeedValidation(2))));
        assert!(!directory_path.exists());
    }
}
