use thiserror::Error;

/// Substring the Agent Chat API uses when a transfer target already sits in
/// the chat.
const ALREADY_PRESENT: &str = "already present in the chat";

#[derive(Debug, Error)]
pub enum Error {
    /// The platform answered with a non-success status.
    #[error("{message} (type {kind})")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("no access token available")]
    Unauthorized,

    #[error("invalid push payload: {message}")]
    InvalidPayload { message: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_payload(message: impl std::fmt::Display) -> Self {
        Self::InvalidPayload {
            message: message.to_string(),
        }
    }

    /// Whether a `transfer_chat` failed only because the target agent is
    /// already in the chat. Callers treat this as success.
    #[must_use]
    pub fn is_agent_already_present(&self) -> bool {
        match self {
            Self::Api { message, .. } => message.to_ascii_lowercase().contains(ALREADY_PRESENT),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Reqwest(e) if e.is_timeout())
    }
}

impl lcbot_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

lcbot_common::impl_context!();

pub type Result<T> = std::result::Result<T, Error>;
