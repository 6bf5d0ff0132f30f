use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration for the bot service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub server: ServerConfig,
    pub platform: PlatformConfig,
    pub credentials: CredentialsConfig,
    pub webhooks: WebhooksConfig,
    pub bot: BotSettings,
}

/// Inbound HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8081,
        }
    }
}

/// Where the platform APIs live and how long a single call may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Base URL for the Configuration and Agent Chat APIs.
    pub api_url: String,
    /// Base URL of the accounts (OAuth) service.
    pub accounts_url: String,
    pub request_timeout_secs: u64,
}

impl PlatformConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.livechatinc.com/v3.5".into(),
            accounts_url: "https://accounts.livechat.com".into(),
            request_timeout_secs: 5,
        }
    }
}

/// Application credentials issued by the platform's developer console.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub client_id: String,

    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: Secret<String>,

    /// Redirect URI registered for the OAuth authorization-code flow.
    pub redirect_uri: String,

    /// Account id the bot posts as. Events authored by it are never answered.
    pub author_id: String,

    /// Pre-issued access token. When set, installs do not wait for the
    /// OAuth callback.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub access_token: Option<Secret<String>>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("author_id", &self.author_id)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: Secret::new(String::new()),
            redirect_uri: String::new(),
            author_id: String::new(),
            access_token: None,
        }
    }
}

/// Webhook registration settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhooksConfig {
    /// Externally reachable base URL of this service; webhooks are registered
    /// as `{public_url}/webhooks/{action}`.
    pub public_url: String,

    /// Shared secret the platform echoes back in every push as `secret_key`.
    #[serde(serialize_with = "serialize_secret")]
    pub secret: Secret<String>,

    /// Reject pushes that carry no `secret_key` at all. Off by default since
    /// older API versions omit it.
    pub require_secret: bool,
}

impl std::fmt::Debug for WebhooksConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhooksConfig")
            .field("public_url", &self.public_url)
            .field("secret", &"[REDACTED]")
            .field("require_secret", &self.require_secret)
            .finish()
    }
}

impl Default for WebhooksConfig {
    fn default() -> Self {
        Self {
            public_url: String::new(),
            secret: Secret::new(String::new()),
            require_secret: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    /// Display name given to the bot agent created at install.
    pub name: String,
    /// How long an install waits for the OAuth callback.
    pub install_timeout_secs: u64,
    /// Hard deadline for graceful shutdown before the process force-exits.
    pub shutdown_timeout_secs: u64,
}

impl BotSettings {
    #[must_use]
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            name: "Onboarding bot".into(),
            install_timeout_secs: 30,
            shutdown_timeout_secs: 10,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
