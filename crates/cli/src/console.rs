//! Operator session over a directory snapshot file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::{debug, info};

use launchpad_identity::directory::DirectorySnapshot;
use launchpad_identity::{
    AuthorizationGate, DirectoryClient, GateDecision, IdentityConfig, MemoryDirectory, Phase,
    Requirement, SessionContext,
};

use crate::config::CliConfig;
use crate::error::CliError;

/// Location the gate is asked about for every console command.
const CONSOLE_PATH: &str = "/admin";

/// Read a snapshot file, or start empty if it does not exist yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub async fn load_directory(path: &Path) -> Result<MemoryDirectory, CliError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No snapshot yet; starting empty");
            return Ok(MemoryDirectory::new());
        }
        Err(e) => return Err(CliError::io(path, e)),
    };
    let snapshot: DirectorySnapshot = serde_json::from_str(&content)?;
    debug!(accounts = snapshot.account_count(), "Loaded snapshot");
    Ok(MemoryDirectory::from_snapshot(snapshot))
}

/// Write the directory back to its snapshot file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn save_directory(directory: &MemoryDirectory, path: &Path) -> Result<(), CliError> {
    let snapshot = directory.snapshot().await;
    let content = serde_json::to_string_pretty(&snapshot)?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| CliError::io(path, e))?;
    debug!(accounts = snapshot.account_count(), "Saved snapshot");
    Ok(())
}

/// A signed-in admin session against a snapshot file.
pub struct Console {
    directory: MemoryDirectory,
    path: PathBuf,
    context: Arc<SessionContext<DirectoryClient>>,
}

impl Console {
    /// Load the snapshot, sign in as the operator and pass the admin gate.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be loaded, the credentials are
    /// rejected, or the operator is not an admin.
    pub async fn open(config: &CliConfig) -> Result<Self, CliError> {
        let directory = load_directory(&config.directory_file).await?;
        let context = open_session(&directory, config.identity.clone());
        context.initialize().await;

        context
            .sign_in(
                &config.operator_email,
                config.operator_password.expose_secret(),
            )
            .await?;
        let state = context
            .wait_for(|s| s.phase == Phase::Ready && s.user().is_some())
            .await;

        let gate = AuthorizationGate::from_config(context.config());
        match gate.evaluate(&state, Requirement::Admin, CONSOLE_PATH) {
            GateDecision::Render => {}
            decision => return Err(CliError::Forbidden(decision)),
        }
        info!(operator = %config.operator_email, "Console session opened");

        Ok(Self {
            directory,
            path: config.directory_file.clone(),
            context,
        })
    }

    pub const fn context(&self) -> &Arc<SessionContext<DirectoryClient>> {
        &self.context
    }

    /// Sign out and persist every change made during the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub async fn close(self) -> Result<(), CliError> {
        if let Err(e) = self.context.sign_out().await {
            debug!(error = %e, "Sign-out failed");
        }
        self.context.shutdown();
        save_directory(&self.directory, &self.path).await
    }
}

fn open_session(
    directory: &MemoryDirectory,
    config: IdentityConfig,
) -> Arc<SessionContext<DirectoryClient>> {
    SessionContext::new(Arc::new(directory.client()), config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use launchpad_core::{Email, Role};
    use launchpad_identity::directory::Provision;
    use secrecy::SecretString;

    use super::*;

    fn config(path: &Path, email: &str) -> CliConfig {
        CliConfig {
            directory_file: path.to_path_buf(),
            operator_email: email.to_string(),
            operator_password: SecretString::from("correct-horse"),
            identity: IdentityConfig::default(),
        }
    }

    async fn seeded(path: &Path) {
        let directory = MemoryDirectory::new();
        for (address, role) in [("root@example.com", Role::Admin), ("w@example.com", Role::Waitlist)] {
            directory
                .provision(Provision::new(Email::parse(address).unwrap(), "correct-horse", role))
                .await
                .unwrap();
        }
        save_directory(&directory, path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let directory = load_directory(&dir.path().join("none.json")).await.unwrap();
        assert_eq!(directory.snapshot().await.account_count(), 0);
    }

    #[tokio::test]
    async fn test_admin_operator_opens_console() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        seeded(&path).await;

        let console = Console::open(&config(&path, "root@example.com")).await.unwrap();
        assert!(console.context().snapshot().is_admin());
        console.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_waitlisted_operator_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        seeded(&path).await;

        let result = Console::open(&config(&path, "w@example.com")).await;
        assert!(matches!(
            result,
            Err(CliError::Forbidden(GateDecision::RedirectHome))
        ));
    }

    #[tokio::test]
    async fn test_close_records_login() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        seeded(&path).await;

        Console::open(&config(&path, "root@example.com"))
            .await
            .unwrap()
            .close()
            .await
            .unwrap();

        let directory = load_directory(&path).await.unwrap();
        let profiles = directory.records("user_profiles").await;
        assert!(profiles.iter().any(|p| p
            .get("email")
            .and_then(|v| v.as_str())
            == Some("root@example.com")
            && p.get("last_login_at").is_some_and(|v| !v.is_null())));
    }
}
