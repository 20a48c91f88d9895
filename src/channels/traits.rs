use crate::tasks::model::UserId;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Inbound message received from a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Adapter that produced the message (e.g. `telegram`).
    pub channel: String,
    /// Chat the message came from; replies and reminders go back here.
    pub user_id: UserId,
    /// Message body; may span several lines.
    pub text: String,
}

/// Outbound message for a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub user_id: UserId,
    pub text: String,
}

/// Messaging gateway contract. New chat transports only implement this trait.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Stable channel identifier (e.g. `telegram`).
    fn id(&self) -> &'static str;

    /// Send a message to a user.
    async fn send(&self, message: OutboundMessage) -> anyhow::Result<()>;

    /// Start receiving inbound messages and forwarding them to the runtime.
    async fn run(&self, inbound_tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;

    /// Best-effort health probe.
    async fn health_check(&self) -> anyhow::Result<bool>;
}
