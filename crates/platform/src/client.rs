use {
    async_trait::async_trait,
    lcbot_common::{AgentId, ChatId, SubscriptionId},
    serde::Serialize,
};

use crate::error::Result;

/// Routing status of a bot agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStatus {
    /// The agent may be assigned chats.
    AcceptingChats,
    Offline,
}

/// Who a webhook subscription applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookScope {
    License,
    Bot,
}

/// A webhook subscription request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRegistration {
    /// Push action name, e.g. `incoming_chat`.
    pub action: String,
    /// Where the platform should deliver the push.
    pub url: String,
    /// Echoed back by the platform in every push as `secret_key`.
    pub secret_key: String,
    pub scope: WebhookScope,
}

/// Operations the bot needs from the chat platform.
///
/// The platform is the source of truth for agents and chats; implementations
/// only translate calls, they keep no state of their own.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Create a bot agent and return its id.
    async fn create_bot(&self, name: &str) -> Result<AgentId>;

    async fn delete_bot(&self, agent: &AgentId) -> Result<()>;

    /// List bot agents. With `all` set, bots owned by other applications on
    /// the license are included too.
    async fn list_bots(&self, all: bool) -> Result<Vec<AgentId>>;

    async fn set_routing_status(&self, agent: &AgentId, status: RoutingStatus) -> Result<()>;

    async fn register_webhook(&self, webhook: &WebhookRegistration) -> Result<SubscriptionId>;

    async fn unregister_webhook(&self, id: &SubscriptionId) -> Result<()>;

    async fn enable_license_webhooks(&self) -> Result<()>;

    async fn disable_license_webhooks(&self) -> Result<()>;

    /// Move `chat` to `target`. When the target is already in the chat the
    /// returned error satisfies [`crate::Error::is_agent_already_present`].
    async fn transfer_chat(&self, chat: &ChatId, target: &AgentId, force: bool) -> Result<()>;

    /// Post a text message into `chat` on behalf of `author`.
    async fn send_event(&self, chat: &ChatId, author: &AgentId, text: &str) -> Result<()>;
}
