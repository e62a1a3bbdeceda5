// ghdash command line.
// Logs in, then prints dashboard views or runs bulk star/follow copies.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ghdash::auth::{Credential, CredentialSlot, DeviceFlow, credentials_path};
use ghdash::batch::CopyProgress;
use ghdash::cache::{FetchOptions, FileBackend, Owner, PersistentStore};
use ghdash::clock::SystemClock;
use ghdash::github::client::format_reset;
use ghdash::{DashboardConfig, GhdashError, Session};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Personal access token. Falls back to a saved device-flow login.
    #[arg(long, env = "GITHUB_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Followers, stars, network gists, and commit activity
    Summary {
        /// Show another user instead of yourself
        #[arg(long)]
        user: Option<String>,
        /// Ignore cached data
        #[arg(long)]
        refresh: bool,
    },
    /// Commit patterns from recent public activity
    Commits {
        login: Option<String>,
        #[arg(long)]
        refresh: bool,
    },
    /// Who follows back and who does not
    Followers {
        login: Option<String>,
        #[arg(long)]
        refresh: bool,
    },
    /// Current API rate limit
    RateLimit,
    /// Star every repository another user has starred
    CopyStars { login: String },
    /// Follow everyone another user follows
    CopyFollowing { login: String },
    /// Remove all cached API responses
    ClearCache,
    /// Authorize through the OAuth device flow
    Login {
        #[arg(long, env = "GHDASH_CLIENT_ID")]
        client_id: String,
    },
    /// Forget the saved login and clear the cache
    Logout,
}

fn owner_for(login: Option<String>) -> Owner {
    match login {
        Some(login) => Owner::user(&login),
        None => Owner::Authenticated,
    }
}

fn credential_slot() -> CredentialSlot {
    match credentials_path() {
        Some(path) => CredentialSlot::at(path),
        None => CredentialSlot::in_memory(),
    }
}

async fn open_session(token: Option<String>, config: DashboardConfig) -> Result<Session> {
    // A supplied token never touches the saved login
    let slot = match token {
        Some(_) => CredentialSlot::in_memory(),
        None => credential_slot(),
    };
    let credential = token
        .map(Credential::personal)
        .or_else(|| slot.get())
        .ok_or(GhdashError::MissingToken)
        .context("set GITHUB_TOKEN or run `ghdash login`")?;

    Session::login(credential, config, slot)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
}

fn print_progress(progress: &CopyProgress) {
    println!(
        "{} of {} done ({} failed, {:.0}%)",
        progress.completed,
        progress.total,
        progress.failed,
        progress.percent()
    );
}

/// Run a bulk copy, printing progress until it finishes or Ctrl-C cancels it.
async fn run_copy(session: &Session, from: &str, stars: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut updates = session.runner().subscribe();
    let reporter = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let progress = *updates.borrow_and_update();
            if progress.in_progress && progress.processed() > 0 {
                print_progress(&progress);
            }
        }
    });

    let dashboard = session.dashboard();
    let progress = if stars {
        dashboard.copy_stars(from, session.runner(), &cancel).await
    } else {
        dashboard.copy_following(from, session.runner(), &cancel).await
    };
    reporter.abort();

    let progress = progress.map_err(|e| anyhow::anyhow!(e.user_message()))?;
    print_progress(&progress);
    if cancel.is_cancelled() {
        println!("Cancelled");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ghdash=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DashboardConfig::from_env();

    match cli.command {
        Command::Login { client_id } => {
            let flow = DeviceFlow::new(client_id)?;
            let pending = flow.start().await.context("could not start device login")?;
            println!(
                "Open {} and enter the code {}",
                pending.verification_uri, pending.user_code
            );
            let credential = flow.wait_for_authorization(&pending).await?;
            let session = Session::login(credential, config, credential_slot()).await?;
            println!("Logged in as {}", session.user().login);
        }
        Command::Logout => {
            let session = open_session(cli.token, config).await?;
            let cleared = session.logout()?;
            credential_slot().clear()?;
            println!("Logged out, removed {cleared} cached entries");
        }
        Command::ClearCache => {
            let dir = config
                .resolved_cache_dir()
                .context("no cache directory available")?;
            let store = PersistentStore::new(
                Arc::new(FileBackend::new(dir, config.storage_quota_bytes)),
                Arc::new(SystemClock),
                config.cache_namespace.clone(),
            );
            println!("Removed {} cached entries", store.clear());
        }
        Command::Summary { user, refresh } => {
            let session = open_session(cli.token, config).await?;
            let data = session
                .dashboard()
                .load(&owner_for(user), refresh)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            println!("{}", data.user.name.as_deref().unwrap_or(&data.user.login));
            println!(
                "Followers {}  Following {}  Mutual {}  Follow-back {:.2}%",
                data.follow.followers,
                data.follow.following,
                data.follow.mutual_follows,
                data.follow.followback_rate
            );
            println!("Starred repositories: {}", data.total_starred);
            for repo in &data.recent_starred {
                println!("  {} (updated {})", repo.full_name, repo.updated_at.format("%Y-%m-%d"));
            }
            println!("Recent gists from people you follow:");
            for gist in &data.network_gists {
                let owner = gist.owner.as_ref().map_or("?", |o| o.login.as_str());
                let title = gist.description.as_deref().unwrap_or("(untitled)");
                println!("  {owner}: {title}");
            }
            println!(
                "Commits: {} recent, current streak {} days, longest {} days",
                data.commit_stats.total_commits,
                data.commit_stats.streak_days,
                data.commit_stats.longest_streak
            );
        }
        Command::Commits { login, refresh } => {
            let session = open_session(cli.token, config).await?;
            let stats = session
                .dashboard()
                .commit_stats(&owner_for(login), FetchOptions::refresh(refresh))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            println!("Total commits: {}", stats.total_commits);
            println!("Active days: {}", stats.commit_dates.len());
            println!("Average per active day: {:.1}", stats.average_commits_per_day);
            if let Some(day) = stats.most_active_day {
                println!("Most active day: {day}");
            }
            if let Some(hour) = stats.most_active_hour {
                println!("Most active hour: {hour:02}:00");
            }
            println!(
                "Streak: {} days (longest {})",
                stats.streak_days, stats.longest_streak
            );
            println!("Style: {}", stats.personality());
        }
        Command::Followers { login, refresh } => {
            let session = open_session(cli.token, config).await?;
            let analysis = session
                .dashboard()
                .follow_analysis(&owner_for(login), FetchOptions::refresh(refresh))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            println!(
                "Mutual {} of {} followed ({:.2}% follow back)",
                analysis.mutual_follows, analysis.following, analysis.followback_rate
            );
            println!("Not following back:");
            for login in &analysis.following_not_followed_back {
                println!("  {login}");
            }
            println!("Followers you do not follow:");
            for login in &analysis.followers_not_following_back {
                println!("  {login}");
            }
        }
        Command::RateLimit => {
            let session = open_session(cli.token, config).await?;
            let status = session.dashboard().rate_limit().await?;
            let core = status.resources.core;
            println!(
                "{} of {} requests left, resets at {}",
                core.remaining,
                core.limit,
                format_reset(core.reset)
            );
        }
        Command::CopyStars { login } => {
            let session = open_session(cli.token, config).await?;
            run_copy(&session, &login, true).await?;
        }
        Command::CopyFollowing { login } => {
            let session = open_session(cli.token, config).await?;
            run_copy(&session, &login, false).await?;
        }
    }

    Ok(())
}
