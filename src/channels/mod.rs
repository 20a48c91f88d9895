//! Chat channels and the bot facade runtime.
//!
//! Adapters are pluggable behind [`ChannelAdapter`]. The runtime owns
//! routing: every inbound message goes through the command surface against
//! the shared task store, and the reply goes back through the adapter the
//! message arrived on.

pub mod commands;
pub mod telegram;
pub mod traits;

use crate::channels::telegram::TelegramAdapter;
use crate::channels::traits::{ChannelAdapter, InboundMessage, OutboundMessage};
use crate::config::TaskbellConfig;
use crate::tasks::shared::TaskStoreHandle;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Configuration validation issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelValidationSeverity {
    Warning,
    Error,
}

/// Validation issue reported before the runtime starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelValidationIssue {
    pub id: String,
    pub title: String,
    pub severity: ChannelValidationSeverity,
    pub summary: String,
}

/// Validate channel configuration without network calls.
///
/// `bot_token` is the token after environment overrides.
#[must_use]
pub fn validate_config(
    config: &TaskbellConfig,
    bot_token: Option<&str>,
) -> Vec<ChannelValidationIssue> {
    let mut issues = Vec::new();

    if bot_token.is_none() {
        issues.push(ChannelValidationIssue {
            id: "telegram-missing-token".to_owned(),
            title: "Telegram token missing".to_owned(),
            severity: ChannelValidationSeverity::Error,
            summary: format!(
                "Set telegram.bot_token in the config file or {}.",
                crate::config::BOT_TOKEN_ENV
            ),
        });
    }

    if config.telegram.allowed_chat_ids.is_empty() {
        issues.push(ChannelValidationIssue {
            id: "telegram-open-allowlist".to_owned(),
            title: "Telegram allowlist is empty".to_owned(),
            severity: ChannelValidationSeverity::Warning,
            summary: "Any chat that finds the bot can store tasks.".to_owned(),
        });
    }

    if !config.telegram.api_base.starts_with("http://")
        && !config.telegram.api_base.starts_with("https://")
    {
        issues.push(ChannelValidationIssue {
            id: "telegram-bad-api-base".to_owned(),
            title: "Telegram API base is not a URL".to_owned(),
            severity: ChannelValidationSeverity::Error,
            summary: format!(
                "telegram.api_base `{}` must start with http:// or https://.",
                config.telegram.api_base
            ),
        });
    }

    // The firing window spans the tolerance on both sides of the aim point.
    let window_secs = u64::from(config.scheduler.fire_tolerance_secs).saturating_mul(2);
    if config.scheduler.tick_interval_secs > window_secs {
        issues.push(ChannelValidationIssue {
            id: "scheduler-tick-exceeds-window".to_owned(),
            title: "Tick interval is wider than the firing window".to_owned(),
            severity: ChannelValidationSeverity::Warning,
            summary: "Some reminders may fall between two ticks and never fire.".to_owned(),
        });
    }

    issues
}

/// Build the adapters enabled by the configuration.
///
/// # Errors
///
/// Fails when an adapter cannot be constructed.
pub fn build_adapters(
    config: &TaskbellConfig,
    bot_token: Option<String>,
) -> anyhow::Result<Vec<Arc<dyn ChannelAdapter>>> {
    let mut adapters: Vec<Arc<dyn ChannelAdapter>> = Vec::new();
    if let Some(token) = bot_token {
        adapters.push(Arc::new(TelegramAdapter::new(&config.telegram, token)?));
    }
    Ok(adapters)
}

/// Best-effort health checks for the given adapters.
pub async fn check_health(adapters: &[Arc<dyn ChannelAdapter>]) -> HashMap<String, bool> {
    let mut health = HashMap::new();
    for adapter in adapters {
        let ok = adapter.health_check().await.unwrap_or(false);
        health.insert(adapter.id().to_owned(), ok);
    }
    health
}

/// Run adapters and route inbound messages until `cancel` fires.
///
/// Each adapter runs in its own worker and is restarted with exponential
/// backoff (2s doubling to 60s) when its receive loop ends.
///
/// # Errors
///
/// Fails when no adapters are given.
pub async fn run_runtime(
    adapters: Vec<Arc<dyn ChannelAdapter>>,
    store: TaskStoreHandle,
    inbound_queue_size: usize,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    if adapters.is_empty() {
        anyhow::bail!("no channel adapters are active");
    }

    let by_id: HashMap<String, Arc<dyn ChannelAdapter>> = adapters
        .iter()
        .map(|a| (a.id().to_owned(), Arc::clone(a)))
        .collect();
    let active: Vec<&str> = by_id.keys().map(String::as_str).collect();
    info!("channels runtime started with [{}]", active.join(", "));

    let (inbound_tx, mut inbound_rx) =
        tokio::sync::mpsc::channel::<InboundMessage>(inbound_queue_size.max(8));

    let mut workers = JoinSet::new();
    for adapter in adapters {
        let tx = inbound_tx.clone();
        workers.spawn(async move {
            let mut backoff_secs = 2u64;
            loop {
                match adapter.run(tx.clone()).await {
                    Ok(()) => warn!("channel {} stopped; restarting", adapter.id()),
                    Err(err) => warn!(
                        "channel {} failed: {err}; retrying in {backoff_secs}s",
                        adapter.id()
                    ),
                }
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs.saturating_mul(2)).min(60);
            }
        });
    }
    drop(inbound_tx);

    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = inbound_rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };
        dispatch(&by_id, &store, message).await;
    }

    workers.abort_all();
    while workers.join_next().await.is_some() {}
    info!("channels runtime stopped");
    Ok(())
}

/// Handle one inbound message and send the reply on its channel.
pub async fn dispatch(
    adapters: &HashMap<String, Arc<dyn ChannelAdapter>>,
    store: &TaskStoreHandle,
    message: InboundMessage,
) {
    info!(
        "inbound {} message from {} ({} chars)",
        message.channel,
        message.user_id,
        message.text.chars().count()
    );
    let Some(adapter) = adapters.get(&message.channel) else {
        warn!("no adapter found for channel `{}`", message.channel);
        return;
    };

    let now = chrono::Local::now().naive_local();
    let reply = commands::handle_message(store, &message.user_id, &message.text, now);
    if let Err(err) = adapter
        .send(OutboundMessage {
            user_id: message.user_id,
            text: reply,
        })
        .await
    {
        error!("failed to send {} reply: {err}", adapter.id());
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::tasks::store::TaskStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct ScriptedAdapter {
        inbound: Mutex<Vec<InboundMessage>>,
        sent: Arc<Mutex<Vec<OutboundMessage>>>,
    }

    #[async_trait]
    impl ChannelAdapter for ScriptedAdapter {
        fn id(&self) -> &'static str {
            "scripted"
        }

        async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn run(&self, inbound_tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
            let pending: Vec<_> = self.inbound.lock().unwrap().drain(..).collect();
            for message in pending {
                inbound_tx.send(message).await?;
            }
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn health_check(&self) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    fn inbound(text: &str) -> InboundMessage {
        InboundMessage {
            channel: "scripted".to_owned(),
            user_id: "42".to_owned(),
            text: text.to_owned(),
        }
    }

    #[test]
    fn validation_flags_missing_token() {
        let config = TaskbellConfig::default();
        let issues = validate_config(&config, None);
        assert!(issues.iter().any(|i| i.id == "telegram-missing-token"
            && i.severity == ChannelValidationSeverity::Error));
        assert!(issues.iter().any(|i| i.id == "telegram-open-allowlist"));
    }

    #[test]
    fn validation_passes_with_token_and_allowlist() {
        let mut config = TaskbellConfig::default();
        config.telegram.allowed_chat_ids = vec!["42".to_owned()];
        assert!(validate_config(&config, Some("token")).is_empty());
    }

    #[test]
    fn validation_flags_bad_api_base_and_slow_ticks() {
        let mut config = TaskbellConfig::default();
        config.telegram.api_base = "api.telegram.org".to_owned();
        config.scheduler.tick_interval_secs = 600;
        let issues = validate_config(&config, Some("token"));
        assert!(issues.iter().any(|i| i.id == "telegram-bad-api-base"));
        assert!(issues.iter().any(|i| i.id == "scheduler-tick-exceeds-window"));
    }

    #[test]
    fn build_adapters_skips_telegram_without_token() {
        let config = TaskbellConfig::default();
        assert!(build_adapters(&config, None).unwrap().is_empty());
        let adapters = build_adapters(&config, Some("t".to_owned())).unwrap();
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].id(), "telegram");
    }

    #[tokio::test]
    async fn runtime_requires_an_adapter() {
        let store = TaskStoreHandle::new(TaskStore::new(None));
        let result = run_runtime(Vec::new(), store, 8, CancellationToken::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn runtime_replies_on_the_inbound_channel() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let adapter = Arc::new(ScriptedAdapter {
            inbound: Mutex::new(vec![
                inbound("https://x.io | VN1 | 9/1 | 20h59 | 17/1/2099"),
                inbound("/list"),
            ]),
            sent: Arc::clone(&sent),
        });
        let store = TaskStoreHandle::new(TaskStore::new(None));
        let cancel = CancellationToken::new();

        let runtime = tokio::spawn(run_runtime(
            vec![adapter as Arc<dyn ChannelAdapter>],
            store.clone(),
            8,
            cancel.clone(),
        ));

        let wait_until = tokio::time::Instant::now() + Duration::from_secs(5);
        while sent.lock().unwrap().len() < 2 {
            assert!(tokio::time::Instant::now() < wait_until, "no replies");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        runtime.await.unwrap().unwrap();

        let sent = sent.lock().unwrap().clone();
        assert_eq!(sent[0].user_id, "42");
        assert!(sent[0].text.starts_with("✅"));
        assert!(sent[1].text.contains("1. VN1 - 20h59 17/1/2099 (https://x.io)"));
        assert_eq!(store.list_tasks("42").len(), 1);
    }

    #[tokio::test]
    async fn dispatch_ignores_unknown_channel() {
        let store = TaskStoreHandle::new(TaskStore::new(None));
        let mut message = inbound("l | A | c | 13H 17/1");
        message.channel = "nowhere".to_owned();
        dispatch(&HashMap::new(), &store, message).await;
        assert!(store.is_empty());
    }
}
