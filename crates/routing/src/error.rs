use lcbot_common::{AgentId, ChatId, LicenseId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("agent {agent_id} is already registered")]
    DuplicateAgent { agent_id: AgentId },

    #[error("license {license_id} is already installed")]
    DuplicateLicense { license_id: LicenseId },

    /// No agent owns the chat, or no agent is free to take it.
    #[error("no agent found for chat {chat_id}")]
    AgentNotFound { chat_id: ChatId },

    #[error("license {license_id} is not installed")]
    LicenseNotFound { license_id: LicenseId },

    /// The license was uninstalled while its install was still running.
    #[error("install of license {license_id} was cancelled by an uninstall")]
    InstallCancelled { license_id: LicenseId },

    #[error("no bot agents available")]
    NoAgentsAvailable,

    #[error("unknown push type: {action}")]
    UnknownPushType { action: String },

    #[error("platform call failed: {0}")]
    PlatformCallFailed(#[from] lcbot_platform::Error),

    #[error("timed out waiting for {what}")]
    Timeout { what: &'static str },

    /// A chat lost its owner again right after being transferred.
    #[error("chat {chat_id} has no owner after transfer")]
    AssignmentRaceDetected { chat_id: ChatId },

    #[error("{what} is not configured")]
    NotConfigured { what: &'static str },
}

impl Error {
    #[must_use]
    pub fn agent_not_found(chat_id: &ChatId) -> Self {
        Self::AgentNotFound {
            chat_id: chat_id.clone(),
        }
    }

    #[must_use]
    pub fn license_not_found(license_id: LicenseId) -> Self {
        Self::LicenseNotFound { license_id }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
