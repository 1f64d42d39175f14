//! `ci-webhook` entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: load the TOML file named by `--config` and
//!    validate every repository entry.
//! 2. **Wire observability**: configure `tracing-subscriber` with an
//!    `EnvFilter` and a pretty or JSON fmt layer. All `tracing` spans and
//!    events emitted by every crate in the workspace flow through this layer.
//! 3. **Construct infrastructure**: build the settings service, the filter
//!    chain, the Jenkins transport, and the background notifier, and inject
//!    them into the listeners.
//! 4. **Run a command**:
//!    - `listen`: read newline-delimited JSON platform events from a file or
//!      stdin and hand each one to the listeners, then wait for outstanding
//!      deliveries.
//!    - `trigger`: notify a repository's endpoints for one commit right away
//!      and print each endpoint's answer.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use jenkins::JenkinsTransport;
use listener::{ListenerSet, RefsChangedListener, TagCreatedListener};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use webhook::eligibility::{BranchFilter, EventKindFilter, IgnoreCommittersFilter};
use webhook::{
    BackgroundNotifier, BranchName, CommitSha, DispatchOutcome, EligibilityFilterChain,
    EventDispatcher, NotificationRequest, ProjectKey, RefName, Repository, RepositorySlug,
    SettingsService,
};

use crate::config::{AppConfig, LogFormat, LoggingConfig};

#[derive(Debug, Parser)]
#[command(name = "ci-webhook", version, about = "Trigger CI builds from repository events")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CI_WEBHOOK_CONFIG", default_value = "ci-webhook.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Handle newline-delimited JSON platform events.
    Listen {
        /// Read events from this file instead of stdin.
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Notify a repository's CI endpoints about one commit and wait for the answers.
    Trigger {
        /// Project key of the repository.
        #[arg(long)]
        project: String,
        /// Slug of the repository.
        #[arg(long)]
        slug: String,
        /// Branch the commit belongs to.
        #[arg(long)]
        branch: String,
        /// Commit SHA to build.
        #[arg(long)]
        commit: String,
        /// Ref handed to the CI server. Defaults to `refs/heads/<branch>`.
        #[arg(long = "ref")]
        git_ref: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;
    init_tracing(&config.logging);

    let settings: Arc<dyn SettingsService> = Arc::new(config.settings_service()?);
    let transport = JenkinsTransport::new(config.platform.clone(), config.notifier.timeout())?;
    let notifier = Arc::new(BackgroundNotifier::new(
        Arc::clone(&settings),
        Arc::new(transport),
        tokio::runtime::Handle::current(),
    ));

    match args.command {
        Command::Listen { events } => {
            let chain = EligibilityFilterChain::new()
                .with_filter(EventKindFilter::new(Arc::clone(&settings)))
                .with_filter(IgnoreCommittersFilter::new(Arc::clone(&settings)))
                .with_filter(BranchFilter::new(Arc::clone(&settings)));
            let dispatcher = EventDispatcher::new(settings, Arc::new(chain), notifier.clone());
            let listeners = ListenerSet::new()
                .with_listener(TagCreatedListener::new(dispatcher.clone()))
                .with_listener(RefsChangedListener::new(dispatcher));

            let stats = match events {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    listen(&listeners, BufReader::new(file)).await?
                }
                None => listen(&listeners, BufReader::new(tokio::io::stdin())).await?,
            };

            info!(in_flight = notifier.in_flight(), "Input exhausted; waiting for deliveries");
            notifier.shutdown().await;
            info!(
                events = stats.events,
                dispatched = stats.dispatched,
                malformed = stats.malformed,
                "Listener finished"
            );
            Ok(())
        }
        Command::Trigger {
            project,
            slug,
            branch,
            commit,
            git_ref,
        } => {
            let request = trigger_request(&project, &slug, &branch, &commit, git_ref.as_deref())?;
            let results = notifier.notify(&request).await;
            if results.is_empty() {
                anyhow::bail!("notifications are not enabled for {}", request.repository);
            }

            for result in &results {
                println!(
                    "{}",
                    serde_json::json!({
                        "endpoint": result.endpoint,
                        "successful": result.successful,
                        "message": result.message,
                    })
                );
            }
            if results.iter().all(|r| !r.successful) {
                anyhow::bail!("no CI endpoint accepted the notification");
            }
            Ok(())
        }
    }
}

fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Tally of what `listen` did with its input.
#[derive(Debug, Default, PartialEq, Eq)]
struct ListenStats {
    events: usize,
    dispatched: usize,
    malformed: usize,
}

async fn listen<R>(listeners: &ListenerSet, reader: R) -> anyhow::Result<ListenStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ListenStats::default();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed to read event input")? {
        if line.trim().is_empty() {
            continue;
        }
        stats.events += 1;
        match listeners.handle_json(&line) {
            DispatchOutcome::Dispatched { notifications } => stats.dispatched += notifications,
            DispatchOutcome::Malformed => stats.malformed += 1,
            DispatchOutcome::Disabled
            | DispatchOutcome::NothingToNotify
            | DispatchOutcome::Ineligible => {}
        }
    }
    if stats.events == 0 {
        warn!("No events were read");
    }
    Ok(stats)
}

fn trigger_request(
    project: &str,
    slug: &str,
    branch: &str,
    commit: &str,
    git_ref: Option<&str>,
) -> anyhow::Result<NotificationRequest> {
    let repository = Repository::new(
        ProjectKey::new(project).context("--project must not be empty")?,
        RepositorySlug::new(slug).context("--slug must not be empty")?,
    );
    let target_branch = BranchName::new(branch).context("--branch must not be empty")?;
    let commit = CommitSha::new(commit).context("--commit must not be empty")?;
    let git_ref = match git_ref {
        Some(r) => RefName::new(r).context("--ref must not be empty")?,
        None => RefName::new(format!("refs/heads/{target_branch}"))
            .context("branch name produced an empty ref")?,
    };

    Ok(NotificationRequest::new(repository, git_ref, commit, target_branch))
}
