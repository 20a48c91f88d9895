//! Telegram Bot API adapter.
//!
//! Long-polls `getUpdates` for inbound text and answers through
//! `sendMessage`. Chats outside a non-empty allowlist are dropped.

use crate::channels::traits::{ChannelAdapter, InboundMessage, OutboundMessage};
use crate::config::TelegramConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Bot API limit for one `sendMessage` text.
const MAX_MESSAGE_CHARS: usize = 4096;

/// Telegram adapter using Bot API long polling (`getUpdates`) and `sendMessage`.
///
/// The chat id is the user id: reminders and replies go back to the chat the
/// task was submitted from.
pub struct TelegramAdapter {
    api_base: String,
    bot_token: String,
    allowed_chat_ids: Vec<String>,
    poll_timeout_secs: u64,
    next_offset: AtomicI64,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    username: Option<String>,
}

impl TelegramAdapter {
    /// Build the adapter with an already-resolved bot token.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be constructed.
    pub fn new(config: &TelegramConfig, bot_token: String) -> anyhow::Result<Self> {
        // Leave headroom over the long-poll timeout so the server answers first.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            bot_token,
            allowed_chat_ids: config.allowed_chat_ids.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            next_offset: AtomicI64::new(0),
            client,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn is_chat_allowed(&self, chat_id: &str) -> bool {
        self.allowed_chat_ids.is_empty()
            || self
                .allowed_chat_ids
                .iter()
                .any(|c| c == "*" || c.as_str() == chat_id)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> anyhow::Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let parsed: ApiResponse<T> = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => anyhow::bail!("telegram {method} failed ({status}): {e}"),
        };
        if !parsed.ok {
            let description = parsed.description.unwrap_or_default();
            anyhow::bail!("telegram {method} failed ({status}): {description}");
        }
        parsed
            .result
            .ok_or_else(|| anyhow::anyhow!("telegram {method} returned no result"))
    }

    /// Fetch one batch of updates and forward accepted text messages.
    ///
    /// Returns how many messages were forwarded.
    pub async fn poll_once(&self, inbound_tx: &mpsc::Sender<InboundMessage>) -> anyhow::Result<usize> {
        let offset = self.next_offset.load(Ordering::SeqCst);
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": self.poll_timeout_secs,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        let mut forwarded = 0;
        for update in updates {
            self.next_offset
                .fetch_max(update.update_id + 1, Ordering::SeqCst);

            let Some(message) = update.message else {
                continue;
            };
            let chat_id = message.chat.id.to_string();
            if !self.is_chat_allowed(&chat_id) {
                debug!("dropping telegram update from chat {chat_id}: not allowlisted");
                continue;
            }
            let Some(text) = message.text.filter(|t| !t.trim().is_empty()) else {
                continue;
            };

            inbound_tx
                .send(InboundMessage {
                    channel: self.id().to_owned(),
                    user_id: chat_id,
                    text,
                })
                .await
                .map_err(|_| anyhow::anyhow!("inbound queue closed"))?;
            forwarded += 1;
        }
        Ok(forwarded)
    }
}

/// Split `text` into chunks of at most `limit` chars, preferring line breaks.
fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl ChannelAdapter for TelegramAdapter {
    fn id(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()> {
        for chunk in split_message(&message.text, MAX_MESSAGE_CHARS) {
            let _: serde_json::Value = self
                .call(
                    "sendMessage",
                    json!({
                        "chat_id": message.user_id,
                        "text": chunk,
                    }),
                )
                .await?;
        }
        Ok(())
    }

    async fn run(&self, inbound_tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        if self.bot_token.trim().is_empty() {
            anyhow::bail!("telegram bot token is empty");
        }
        loop {
            self.poll_once(&inbound_tx).await?;
        }
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        if self.bot_token.trim().is_empty() {
            return Ok(false);
        }
        let me: TgUser = self.call("getMe", json!({})).await?;
        debug!(
            "telegram bot @{} is reachable",
            me.username.unwrap_or_default()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer, allowed: &[&str]) -> TelegramAdapter {
        let config = TelegramConfig {
            bot_token: String::new(),
            allowed_chat_ids: allowed.iter().map(|s| (*s).to_owned()).collect(),
            api_base: server.uri(),
            poll_timeout_secs: 0,
        };
        TelegramAdapter::new(&config, "TEST".to_owned()).unwrap()
    }

    fn update(id: i64, chat: i64, text: &str) -> serde_json::Value {
        json!({
            "update_id": id,
            "message": {
                "message_id": id,
                "date": 0,
                "chat": { "id": chat, "type": "private" },
                "text": text
            }
        })
    }

    #[tokio::test]
    async fn poll_forwards_messages_and_advances_offset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/getUpdates"))
            .and(body_partial_json(json!({ "offset": 0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [update(41, 1001, "/list"), update(42, 1002, "hello")]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/botTEST/getUpdates"))
            .and(body_partial_json(json!({ "offset": 43 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter(&server, &[]);
        let (tx, mut rx) = mpsc::channel(8);

        assert_eq!(adapter.poll_once(&tx).await.unwrap(), 2);
        let first = rx.recv().await.unwrap();
        assert_eq!(first.channel, "telegram");
        assert_eq!(first.user_id, "1001");
        assert_eq!(first.text, "/list");
        assert_eq!(rx.recv().await.unwrap().user_id, "1002");

        assert_eq!(adapter.poll_once(&tx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn poll_drops_chats_outside_allowlist_and_non_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [
                    update(1, 1001, "allowed"),
                    update(2, 6666, "blocked"),
                    { "update_id": 3, "message": { "chat": { "id": 1001 } } },
                    { "update_id": 4 }
                ]
            })))
            .mount(&server)
            .await;

        let adapter = adapter(&server, &["1001"]);
        let (tx, mut rx) = mpsc::channel(8);
        assert_eq!(adapter.poll_once(&tx).await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap().text, "allowed");
        assert_eq!(adapter.next_offset.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn send_posts_chat_id_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .and(body_partial_json(json!({ "chat_id": "1001", "text": "hi" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "message_id": 7 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter(&server, &[]);
        adapter
            .send(OutboundMessage {
                user_id: "1001".to_owned(),
                text: "hi".to_owned(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let adapter = adapter(&server, &[]);
        let err = adapter
            .send(OutboundMessage {
                user_id: "1001".to_owned(),
                text: "hi".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("blocked by the user"));
    }

    #[tokio::test]
    async fn health_check_calls_get_me() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTEST/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": { "id": 1, "is_bot": true, "username": "deadline_bot" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(adapter(&server, &[]).health_check().await.unwrap());
    }

    #[test]
    fn long_messages_split_on_lines() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(split_message(text, 10), vec!["aaaa\nbbbb\n", "cccc"]);
        assert_eq!(split_message("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(split_message("short", 4096), vec!["short"]);
    }
}
