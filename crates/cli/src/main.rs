//! Launchpad CLI - Operator console for accounts and the waitlist.
//!
//! # Usage
//!
//! ```bash
//! # Create the first admin and some waitlisted accounts
//! lp-cli --directory launchpad.json seed accounts.yaml
//!
//! # Inspect accounts
//! lp-cli users list
//! lp-cli users counts
//!
//! # Work the waitlist
//! lp-cli waitlist list
//! lp-cli waitlist move early@example.com 1
//! lp-cli waitlist approve early@example.com
//! ```
//!
//! # Commands
//!
//! - `seed` - Provision accounts from a YAML file
//! - `users` - List, count, re-role and delete accounts
//! - `waitlist` - List, reorder, prioritize, approve and remove waitlisted accounts
//!
//! Every command except `seed` signs in as `LAUNCHPAD_OPERATOR_EMAIL` and
//! requires that account to be an admin.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launchpad_core::{Email, PriorityLevel, Role};
use launchpad_identity::IdentityConfig;

mod commands;
mod config;
mod console;
mod error;

use config::CliConfig;
use console::Console;
use error::CliError;

#[derive(Parser)]
#[command(name = "lp-cli")]
#[command(author, version, about = "Launchpad operator console")]
struct Cli {
    /// Directory snapshot file (defaults to `LAUNCHPAD_DIRECTORY_FILE`)
    #[arg(short, long, global = true)]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision accounts from a YAML file
    Seed {
        /// Path to the seed file
        file: PathBuf,
    },
    /// Manage accounts and roles
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Manage the waitlist
    Waitlist {
        #[command(subcommand)]
        action: WaitlistAction,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List every account, newest first
    List,
    /// Count accounts per role
    Counts,
    /// Change an account's role (`admin`, `waitlist`, `user`)
    SetRole { email: Email, role: Role },
    /// Delete an account
    Delete { email: Email },
}

#[derive(Subcommand)]
enum WaitlistAction {
    /// List waitlisted accounts by position
    List,
    /// Give an account a new position
    Move { email: Email, position: u32 },
    /// Set an account's priority (`low`, `normal`, `high`, `vip`)
    Priority { email: Email, level: PriorityLevel },
    /// Admit an account
    Approve { email: Email },
    /// Delete a waitlisted account
    Remove { email: Email },
    /// Show the standing an account sees for itself
    Standing { email: Email },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &IdentityConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let identity = IdentityConfig::from_env();
    let _sentry_guard = identity.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "launchpad_cli=info,launchpad_identity=warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match identity {
        Ok(identity) => run(cli, identity).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, identity: IdentityConfig) -> Result<(), CliError> {
    if let Commands::Seed { file } = &cli.command {
        let directory_file = config::directory_file(cli.directory, &|key: &str| {
            std::env::var(key).ok()
        })?;
        commands::seed::accounts(file, &directory_file, identity.min_password_length).await?;
        return Ok(());
    }

    let config = CliConfig::from_env(cli.directory)?;
    let console = Console::open(&config).await?;
    let result = dispatch(&console, cli.command).await;
    // Persist whatever succeeded, even if the command itself failed
    console.close().await?;
    result
}

async fn dispatch(console: &Console, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Seed { .. } => {}
        Commands::Users { action } => match action {
            UsersAction::List => {
                commands::users::list(console).await?;
            }
            UsersAction::Counts => {
                commands::users::counts(console).await?;
            }
            UsersAction::SetRole { email, role } => {
                commands::users::set_role(console, &email, role).await?;
            }
            UsersAction::Delete { email } => {
                commands::users::delete(console, &email).await?;
            }
        },
        Commands::Waitlist { action } => match action {
            WaitlistAction::List => {
                commands::waitlist::list(console).await?;
            }
            WaitlistAction::Move { email, position } => {
                commands::waitlist::move_to(console, &email, position).await?;
            }
            WaitlistAction::Priority { email, level } => {
                commands::waitlist::set_priority(console, &email, level).await?;
            }
            WaitlistAction::Approve { email } => {
                commands::waitlist::approve(console, &email).await?;
            }
            WaitlistAction::Remove { email } => {
                commands::waitlist::remove(console, &email).await?;
            }
            WaitlistAction::Standing { email } => {
                commands::waitlist::standing(console, &email).await?;
            }
        },
    }
    Ok(())
}
