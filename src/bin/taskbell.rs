//! CLI binary for taskbell.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use taskbell::channels::{self, ChannelValidationSeverity};
use taskbell::tasks::store::build_task;
use taskbell::{ReminderScheduler, TaskStore, TaskStoreHandle, TaskbellConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Taskbell: chat-driven deadline reminders.
#[derive(Parser)]
#[command(name = "taskbell", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the per-user task files.
    #[arg(long)]
    tasks_dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run the bot and the reminder scheduler.
    Run,

    /// Parse one task line offline and print what would be stored.
    Check {
        /// The task line, quoted.
        line: String,

        /// Print the task as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(
    config: &TaskbellConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .context("invalid log filter")?;

    let (file_layer, guard) = match &config.logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "taskbell.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(TaskbellConfig::default_config_path);
    let mut config = TaskbellConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(dir) = cli.tasks_dir {
        config.store.tasks_dir = Some(dir);
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Check { line, json } => check_line(&line, json),
        Command::Run => {
            let _log_guard = init_tracing(&config)?;
            run_bot(config).await
        }
    }
}

fn check_line(line: &str, json: bool) -> anyhow::Result<()> {
    let now = chrono::Local::now().naive_local();
    let task = build_task(line, now).with_context(|| format!("rejected: {line}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }
    println!("link:         {}", task.link);
    println!("order id:     {}", task.order_id);
    println!("created date: {}", task.created_date);
    println!("deadline:     {}", task.deadline_text);
    println!("resolves to:  {}", task.deadline_at.format("%Y-%m-%d %H:%M"));
    Ok(())
}

async fn run_bot(config: TaskbellConfig) -> anyhow::Result<()> {
    info!("taskbell v{}", env!("CARGO_PKG_VERSION"));

    let bot_token = config.telegram.resolved_bot_token();
    let issues = channels::validate_config(&config, bot_token.as_deref());
    let mut blocking = false;
    for issue in &issues {
        match issue.severity {
            ChannelValidationSeverity::Warning => warn!("{}: {}", issue.title, issue.summary),
            ChannelValidationSeverity::Error => {
                blocking = true;
                error!("{}: {}", issue.title, issue.summary);
            }
        }
    }
    if blocking {
        anyhow::bail!("configuration has blocking errors");
    }

    let tasks_dir = config.store.resolved_tasks_dir();
    let now = chrono::Local::now().naive_local();
    let store = TaskStoreHandle::new(TaskStore::open(tasks_dir, now));

    let adapters = channels::build_adapters(&config, bot_token)?;
    let health = channels::check_health(&adapters).await;
    for (id, ok) in &health {
        if *ok {
            info!("channel {id} is healthy");
        } else {
            warn!("channel {id} failed its health check");
        }
    }
    let Some(gateway) = adapters.first().map(Arc::clone) else {
        anyhow::bail!("no channel adapters are configured");
    };

    let cancel = CancellationToken::new();
    let scheduler = ReminderScheduler::new(store.clone(), gateway, cancel.clone())
        .with_config(&config.scheduler)
        .run();

    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
        }
        ctrl_c_cancel.cancel();
    });

    let result = channels::run_runtime(
        adapters,
        store.clone(),
        config.channels.inbound_queue_size,
        cancel.clone(),
    )
    .await;
    cancel.cancel();
    if let Err(e) = scheduler.await {
        error!("reminder scheduler ended abnormally: {e}");
    }
    if let Err(e) = store.persist_all() {
        error!("final save failed: {e}");
    }
    result
}
