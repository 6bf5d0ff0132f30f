use std::sync::Arc;

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tokio::sync::watch,
    tracing::{debug, info},
};

use crate::error::{Error, Result};

/// Holds the current platform access token and wakes anyone waiting for the
/// first one.
///
/// Clones share the same slot.
#[derive(Clone)]
pub struct TokenStore {
    slot: Arc<watch::Sender<Option<Secret<String>>>>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { slot: Arc::new(tx) }
    }

    /// A store that is ready from the start.
    pub fn with_token(token: Secret<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    pub fn set(&self, token: Secret<String>) {
        self.slot.send_replace(Some(token));
    }

    #[must_use]
    pub fn current(&self) -> Option<Secret<String>> {
        self.slot.borrow().clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Wait until a token is available. Pair with `tokio::time::timeout`.
    pub async fn ready(&self) -> Result<Secret<String>> {
        let mut rx = self.slot.subscribe();
        let token = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::Unauthorized)?;
        token.clone().ok_or(Error::Unauthorized)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Authorization-code exchange against the platform's accounts service.
pub struct OAuthClient {
    http: reqwest::Client,
    accounts_url: String,
    client_id: String,
    client_secret: Secret<String>,
    redirect_uri: String,
}

impl OAuthClient {
    pub fn new(
        http: reqwest::Client,
        accounts_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Secret<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            http,
            accounts_url: accounts_url.into(),
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Trade an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<Secret<String>> {
        let token_url = format!("{}/v2/token", self.accounts_url.trim_end_matches('/'));
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        debug!(url = %token_url, "exchanging authorization code");
        let resp = self.http.post(token_url).form(&form).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                kind: "oauth".into(),
                message: format!("token exchange failed: {body}"),
            });
        }

        let body: TokenResponse = resp.json().await?;
        info!(expires_in = ?body.expires_in, "obtained platform access token");
        Ok(Secret::new(body.access_token))
    }
}
