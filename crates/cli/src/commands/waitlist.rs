//! Waitlist management commands.

use tracing::info;

use launchpad_core::{Email, PriorityLevel};
use launchpad_identity::models::WaitlistListing;
use launchpad_identity::{DirectoryClient, WaitlistBoard, WaitlistStanding};

use crate::console::Console;
use crate::error::CliError;

/// Log the waitlist in position order.
///
/// # Errors
///
/// Returns an error if the waitlist cannot be listed.
pub async fn list(console: &Console) -> Result<usize, CliError> {
    let board = loaded_board(console).await?;
    let rows = board.rows().unwrap_or_default();

    info!("Waitlist ({})", rows.len());
    for row in rows {
        info!(
            "  #{:<5} {:<7} {:<32} {}",
            row.position(),
            row.entry.priority_level.as_str(),
            row.email.as_str(),
            row.full_name.as_deref().unwrap_or("-"),
        );
    }
    Ok(rows.len())
}

/// Give a waitlisted account a new position.
///
/// # Errors
///
/// Returns an error if the account is not waitlisted or the position is 0.
pub async fn move_to(console: &Console, email: &Email, position: u32) -> Result<(), CliError> {
    let mut board = loaded_board(console).await?;
    let listing = resolve(&board, email)?;
    let ok = board.reposition(listing.id(), position).await;
    report(&board, ok)
}

/// # Errors
///
/// Returns an error if the account is not waitlisted or the update fails.
pub async fn set_priority(
    console: &Console,
    email: &Email,
    priority: PriorityLevel,
) -> Result<(), CliError> {
    let mut board = loaded_board(console).await?;
    let listing = resolve(&board, email)?;
    let ok = board.set_priority(listing.id(), priority).await;
    report(&board, ok)
}

/// Admit a waitlisted account.
///
/// # Errors
///
/// Returns an error if the account is not waitlisted or the role change fails.
pub async fn approve(console: &Console, email: &Email) -> Result<(), CliError> {
    let mut board = loaded_board(console).await?;
    let listing = resolve(&board, email)?;
    let ok = board.approve(listing.id()).await;
    report(&board, ok)
}

/// Delete a waitlisted account.
///
/// # Errors
///
/// Returns an error if the account is not waitlisted or the deletion fails.
pub async fn remove(console: &Console, email: &Email) -> Result<(), CliError> {
    let mut board = loaded_board(console).await?;
    let listing = resolve(&board, email)?;
    let ok = board.remove(listing.id()).await;
    report(&board, ok)
}

/// Log the standing a waitlisted account would see for itself.
///
/// # Errors
///
/// Returns an error if the account is not waitlisted or the counts cannot be
/// read.
pub async fn standing(console: &Console, email: &Email) -> Result<WaitlistStanding, CliError> {
    let board = loaded_board(console).await?;
    let listing = resolve(&board, email)?;
    let context = console.context();
    let total = context.identity_service().count_by_role().await?.waitlist;
    let standing = WaitlistStanding::from_entry(
        &listing.entry,
        total,
        context.config().admissions_per_week,
    );

    info!("Standing for {email}");
    info!("  Position: {} of {}", standing.position, standing.total);
    info!("  Priority: {}", standing.priority_level);
    info!("  Progress: {}%", standing.progress_percent());
    info!(
        "  Estimated wait: {} ({} weeks at {} admissions/week)",
        standing.estimate,
        standing.estimated_weeks,
        context.config().admissions_per_week,
    );
    Ok(standing)
}

async fn loaded_board(console: &Console) -> Result<WaitlistBoard<DirectoryClient>, CliError> {
    let mut board = WaitlistBoard::new(console.context().clone());
    if board.reload().await {
        Ok(board)
    } else {
        Err(board_error(&board))
    }
}

fn resolve<'b>(
    board: &'b WaitlistBoard<DirectoryClient>,
    email: &Email,
) -> Result<&'b WaitlistListing, CliError> {
    board
        .rows()
        .unwrap_or_default()
        .iter()
        .find(|row| &row.email == email)
        .ok_or_else(|| CliError::NotWaitlisted(email.to_string()))
}

fn report(board: &WaitlistBoard<DirectoryClient>, ok: bool) -> Result<(), CliError> {
    if !ok {
        return Err(board_error(board));
    }
    if let Some(notice) = board.notice() {
        info!("{}", notice.message);
    }
    Ok(())
}

fn board_error(board: &WaitlistBoard<DirectoryClient>) -> CliError {
    CliError::Action(
        board
            .notice()
            .map_or_else(|| "Waitlist could not be loaded".to_string(), |n| n.message.clone()),
    )
}
