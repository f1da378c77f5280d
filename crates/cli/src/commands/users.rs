//! Account and role management commands.

use tracing::info;

use launchpad_core::{Email, Role, UserId};
use launchpad_identity::{AccountsBoard, DirectoryClient, RoleCounts};

use crate::console::Console;
use crate::error::CliError;

/// Log every account, newest first.
///
/// # Errors
///
/// Returns an error if the accounts cannot be listed.
pub async fn list(console: &Console) -> Result<usize, CliError> {
    let board = loaded_board(console).await?;
    let profiles = board.profiles().unwrap_or_default();

    info!("Accounts ({})", profiles.len());
    for profile in profiles {
        let last_login = profile
            .last_login_at
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
        info!(
            "  {:<8} {:<32} {:<24} last login: {last_login}",
            profile.role.as_str(),
            profile.email.as_str(),
            profile.display_name(),
        );
    }
    Ok(profiles.len())
}

/// Log the number of accounts per role.
///
/// # Errors
///
/// Returns an error if the counts cannot be read.
pub async fn counts(console: &Console) -> Result<RoleCounts, CliError> {
    let counts = console.context().identity_service().count_by_role().await?;

    info!("Accounts by role");
    for role in Role::ALL {
        info!("  {role}: {}", counts.get(role));
    }
    info!("  total: {}", counts.total());
    Ok(counts)
}

/// Move an account to a different role.
///
/// # Errors
///
/// Returns an error if the email matches no account or the change fails.
pub async fn set_role(console: &Console, email: &Email, role: Role) -> Result<(), CliError> {
    let mut board = loaded_board(console).await?;
    let user_id = resolve(&board, email)?;
    let ok = board.set_role(user_id, role).await;
    report(&board, ok)
}

/// Delete an account and everything attached to it.
///
/// # Errors
///
/// Returns an error if the email matches no account or the deletion fails.
pub async fn delete(console: &Console, email: &Email) -> Result<(), CliError> {
    let mut board = loaded_board(console).await?;
    let user_id = resolve(&board, email)?;
    let ok = board.remove(user_id).await;
    report(&board, ok)
}

async fn loaded_board(console: &Console) -> Result<AccountsBoard<DirectoryClient>, CliError> {
    let mut board = AccountsBoard::new(console.context().clone());
    if board.reload().await {
        Ok(board)
    } else {
        Err(board_error(&board))
    }
}

fn resolve(board: &AccountsBoard<DirectoryClient>, email: &Email) -> Result<UserId, CliError> {
    board
        .profiles()
        .unwrap_or_default()
        .iter()
        .find(|p| &p.email == email)
        .map(|p| p.id)
        .ok_or_else(|| CliError::UnknownAccount(email.to_string()))
}

fn report(board: &AccountsBoard<DirectoryClient>, ok: bool) -> Result<(), CliError> {
    if !ok {
        return Err(board_error(board));
    }
    if let Some(notice) = board.notice() {
        info!("{}", notice.message);
    }
    Ok(())
}

fn board_error(board: &AccountsBoard<DirectoryClient>) -> CliError {
    CliError::Action(
        board
            .notice()
            .map_or_else(|| "Accounts could not be loaded".to_string(), |n| n.message.clone()),
    )
}
