//! Inbound push payloads.
//!
//! Every push carries an `action` discriminator and a `license_id`; only the
//! payload fields routing needs are decoded, the rest is ignored.

use {
    lcbot_common::{ChatId, LicenseId},
    serde::Deserialize,
};

use crate::error::{Error, Result};

pub const INCOMING_CHAT: &str = "incoming_chat";
pub const INCOMING_EVENT: &str = "incoming_event";
pub const USER_ADDED_TO_CHAT: &str = "user_added_to_chat";

/// Actions the bot subscribes to at install.
pub const SUBSCRIBED_ACTIONS: [&str; 3] = [INCOMING_CHAT, INCOMING_EVENT, USER_ADDED_TO_CHAT];

/// A decoded push delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    pub license_id: LicenseId,
    /// Secret echoed back from webhook registration, if the platform sent one.
    pub secret_key: Option<String>,
    pub event: PushEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    IncomingChat {
        chat_id: ChatId,
    },
    IncomingEvent {
        chat_id: ChatId,
        thread_id: Option<String>,
        event: ChatEvent,
    },
    UserAddedToChat {
        chat_id: ChatId,
        user: ChatUser,
    },
    /// A well-formed push with an action this bot does not handle.
    Unknown {
        action: String,
    },
}

impl PushEvent {
    #[must_use]
    pub fn action(&self) -> &str {
        match self {
            Self::IncomingChat { .. } => INCOMING_CHAT,
            Self::IncomingEvent { .. } => INCOMING_EVENT,
            Self::UserAddedToChat { .. } => USER_ADDED_TO_CHAT,
            Self::Unknown { action } => action,
        }
    }

    #[must_use]
    pub fn chat_id(&self) -> Option<&ChatId> {
        match self {
            Self::IncomingChat { chat_id }
            | Self::IncomingEvent { chat_id, .. }
            | Self::UserAddedToChat { chat_id, .. } => Some(chat_id),
            Self::Unknown { .. } => None,
        }
    }
}

/// A chat event (message, file, system message, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub author_id: String,
}

impl ChatEvent {
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.kind == "message"
    }
}

/// A user that joined a chat.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub present: bool,
}

impl ChatUser {
    #[must_use]
    pub fn is_agent(&self) -> bool {
        self.kind == "agent"
    }
}

#[derive(Deserialize)]
struct RawPush {
    action: String,
    license_id: LicenseId,
    #[serde(default)]
    secret_key: Option<String>,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct IncomingChatPayload {
    chat: ChatRef,
}

#[derive(Deserialize)]
struct ChatRef {
    id: ChatId,
}

#[derive(Deserialize)]
struct IncomingEventPayload {
    chat_id: ChatId,
    #[serde(default)]
    thread_id: Option<String>,
    event: ChatEvent,
}

#[derive(Deserialize)]
struct UserAddedPayload {
    chat_id: ChatId,
    user: ChatUser,
}

impl Push {
    /// Decode a push body. Unknown actions decode to [`PushEvent::Unknown`];
    /// a known action with a malformed payload is an error.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let raw: RawPush = serde_json::from_slice(body).map_err(Error::invalid_payload)?;
        let payload = raw.payload;

        let event = match raw.action.as_str() {
            INCOMING_CHAT => {
                let p: IncomingChatPayload = decode(&raw.action, payload)?;
                PushEvent::IncomingChat { chat_id: p.chat.id }
            },
            // Older API versions name the same push `incoming_message`.
            INCOMING_EVENT | "incoming_message" => {
                let p: IncomingEventPayload = decode(&raw.action, payload)?;
                PushEvent::IncomingEvent {
                    chat_id: p.chat_id,
                    thread_id: p.thread_id,
                    event: p.event,
                }
            },
            USER_ADDED_TO_CHAT => {
                let p: UserAddedPayload = decode(&raw.action, payload)?;
                PushEvent::UserAddedToChat {
                    chat_id: p.chat_id,
                    user: p.user,
                }
            },
            _ => PushEvent::Unknown { action: raw.action },
        };

        Ok(Self {
            license_id: raw.license_id,
            secret_key: raw.secret_key,
            event,
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(action: &str, payload: serde_json::Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| Error::invalid_payload(format!("{action} payload: {e}")))
}

/// Application lifecycle callback sent when a customer installs or removes
/// the app.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LifecycleEvent {
    #[serde(alias = "licenseID")]
    pub license_id: LicenseId,
    pub event: LifecycleAction,
    #[serde(default, alias = "applicationName")]
    pub application_name: Option<String>,
    #[serde(default, alias = "clientID")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    ApplicationInstalled,
    ApplicationUninstalled,
    #[serde(other)]
    Other,
}
