//! Wire types for the Configuration API and the Agent Chat API.

use serde::{Deserialize, Serialize};

use crate::client::{RoutingStatus, WebhookScope};

pub const CREATE_BOT: &str = "/configuration/action/create_bot";
pub const DELETE_BOT: &str = "/configuration/action/delete_bot";
pub const LIST_BOTS: &str = "/configuration/action/list_bots";
pub const REGISTER_WEBHOOK: &str = "/configuration/action/register_webhook";
pub const UNREGISTER_WEBHOOK: &str = "/configuration/action/unregister_webhook";
pub const ENABLE_LICENSE_WEBHOOKS: &str = "/configuration/action/enable_license_webhooks";
pub const DISABLE_LICENSE_WEBHOOKS: &str = "/configuration/action/disable_license_webhooks";
pub const TRANSFER_CHAT: &str = "/agent/action/transfer_chat";
pub const SEND_EVENT: &str = "/agent/action/send_event";
pub const SET_ROUTING_STATUS: &str = "/agent/action/set_routing_status";

/// Header that makes an Agent Chat API call act as a specific agent.
pub const AUTHOR_HEADER: &str = "X-Author-Id";

#[derive(Debug, Serialize)]
pub struct CreateBotRequest<'a> {
    pub name: &'a str,
    pub owner_client_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct IdRequest<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ListBotsRequest {
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct BotSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SetRoutingStatusRequest<'a> {
    pub agent_id: &'a str,
    pub status: RoutingStatus,
}

#[derive(Debug, Serialize)]
pub struct RegisterWebhookRequest<'a> {
    pub action: &'a str,
    pub secret_key: &'a str,
    pub url: &'a str,
    #[serde(rename = "type")]
    pub scope: WebhookScope,
    pub owner_client_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct UnregisterWebhookRequest<'a> {
    pub id: &'a str,
    pub owner_client_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OwnerRequest<'a> {
    pub owner_client_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TransferChatRequest<'a> {
    pub id: &'a str,
    pub target: TransferTarget<'a>,
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct TransferTarget<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub ids: [&'a str; 1],
}

#[derive(Debug, Serialize)]
pub struct SendEventRequest<'a> {
    pub chat_id: &'a str,
    pub event: MessageEvent<'a>,
}

#[derive(Debug, Serialize)]
pub struct MessageEvent<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub visibility: &'static str,
}

/// Error envelope returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}
