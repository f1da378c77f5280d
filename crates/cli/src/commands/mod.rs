//! CLI command implementations.

pub mod seed;
pub mod users;
pub mod waitlist;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use launchpad_core::{Email, PriorityLevel, Role};
    use launchpad_identity::IdentityConfig;
    use launchpad_identity::directory::Provision;
    use launchpad_identity::{MemoryDirectory, WaitEstimate};
    use secrecy::SecretString;

    use crate::config::CliConfig;
    use crate::console::{Console, load_directory, save_directory};
    use crate::error::CliError;

    const PASSWORD: &str = "correct-horse";

    fn email(address: &str) -> Email {
        Email::parse(address).unwrap()
    }

    async fn open(path: &Path) -> Console {
        let config = CliConfig {
            directory_file: path.to_path_buf(),
            operator_email: "root@example.com".to_string(),
            operator_password: SecretString::from(PASSWORD),
            identity: IdentityConfig::default(),
        };
        Console::open(&config).await.unwrap()
    }

    /// Admin plus `count` waitlisted accounts `w1@`, `w2@`, ... in order.
    async fn seeded(path: &Path, count: u32) {
        let directory = MemoryDirectory::new();
        directory
            .provision(Provision::new(email("root@example.com"), PASSWORD, Role::Admin))
            .await
            .unwrap();
        for n in 1..=count {
            directory
                .provision(Provision::new(
                    email(&format!("w{n}@example.com")),
                    PASSWORD,
                    Role::Waitlist,
                ))
                .await
                .unwrap();
        }
        save_directory(&directory, path).await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_persists_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        seeded(&path, 2).await;

        let console = open(&path).await;
        super::waitlist::approve(&console, &email("w1@example.com"))
            .await
            .unwrap();
        console.close().await.unwrap();

        let console = open(&path).await;
        assert_eq!(super::waitlist::list(&console).await.unwrap(), 1);
        let counts = super::users::counts(&console).await.unwrap();
        assert_eq!((counts.admin, counts.waitlist, counts.user), (1, 1, 1));
        console.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_standing_uses_waitlist_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        seeded(&path, 20).await;

        let console = open(&path).await;
        let standing = super::waitlist::standing(&console, &email("w14@example.com"))
            .await
            .unwrap();
        assert_eq!(standing.position, 14);
        assert_eq!(standing.total, 20);
        assert_eq!(standing.progress_percent(), 70);
        assert_eq!(standing.estimate, WaitEstimate::Weeks(2));
        console.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_move_and_priority() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        seeded(&path, 2).await;

        let console = open(&path).await;
        super::waitlist::move_to(&console, &email("w2@example.com"), 1)
            .await
            .unwrap();
        super::waitlist::set_priority(&console, &email("w2@example.com"), PriorityLevel::High)
            .await
            .unwrap();
        let zero = super::waitlist::move_to(&console, &email("w1@example.com"), 0).await;
        assert!(matches!(zero, Err(CliError::Action(_))));
        console.close().await.unwrap();

        let directory = load_directory(&path).await.unwrap();
        let rows = directory.records("waitlist_users").await;
        let positions: Vec<_> = rows
            .iter()
            .filter_map(|r| r.get("position").and_then(serde_json::Value::as_u64))
            .collect();
        assert_eq!(positions.iter().filter(|p| **p == 1).count(), 2);
        assert!(rows.iter().any(|r| r.get("priority_level").and_then(|v| v.as_str()) == Some("high")));
    }

    #[tokio::test]
    async fn test_unknown_emails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        seeded(&path, 1).await;

        let console = open(&path).await;
        let missing = super::users::delete(&console, &email("ghost@example.com")).await;
        assert!(matches!(missing, Err(CliError::UnknownAccount(_))));
        let admin = super::waitlist::remove(&console, &email("root@example.com")).await;
        assert!(matches!(admin, Err(CliError::NotWaitlisted(_))));
        console.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_role_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("directory.json");
        seeded(&path, 2).await;

        let console = open(&path).await;
        super::users::set_role(&console, &email("w1@example.com"), Role::Admin)
            .await
            .unwrap();
        super::users::delete(&console, &email("w2@example.com"))
            .await
            .unwrap();
        assert_eq!(super::users::list(&console).await.unwrap(), 2);
        console.close().await.unwrap();

        let directory = load_directory(&path).await.unwrap();
        assert!(directory.account_id(&email("w2@example.com")).await.is_none());
        assert_eq!(directory.records("admin_users").await.len(), 1);
    }
}
