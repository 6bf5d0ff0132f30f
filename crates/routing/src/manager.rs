use std::{sync::Arc, time::Duration};

use {
    futures::future::join_all,
    lcbot_common::{AgentId, LicenseId},
    lcbot_config::BotConfig,
    lcbot_platform::{
        OAuthClient, PlatformClient, TokenStore, WebhookRegistration, WebhookScope,
        push::SUBSCRIBED_ACTIONS,
    },
    secrecy::{ExposeSecret, Secret},
    tracing::{info, warn},
};

use crate::{
    agent::AgentRecord,
    error::{Error, Result},
    license::{LicenseEntry, LicenseRegistry},
    provisioner::Provisioner,
    router::Router,
};

/// Settings the manager needs from the service configuration.
#[derive(Clone)]
pub struct ManagerConfig {
    pub bot_name: String,
    pub author_id: String,
    /// Public base URL; webhooks are registered under `/webhooks/{action}`.
    pub webhook_base_url: String,
    pub webhook_secret: Secret<String>,
    /// Reject pushes without a `secret_key`.
    pub require_webhook_secret: bool,
    pub install_timeout: Duration,
}

impl ManagerConfig {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            bot_name: config.bot.name.clone(),
            author_id: config.credentials.author_id.clone(),
            webhook_base_url: config.webhooks.public_url.trim_end_matches('/').to_string(),
            webhook_secret: config.webhooks.secret.clone(),
            require_webhook_secret: config.webhooks.require_secret,
            install_timeout: config.bot.install_timeout(),
        }
    }

    fn webhook_url(&self, action: &str) -> String {
        format!("{}/webhooks/{action}", self.webhook_base_url)
    }
}

/// Owns every installed license and drives install, uninstall and shutdown.
pub struct BotManager {
    licenses: Arc<LicenseRegistry>,
    platform: Arc<dyn PlatformClient>,
    provisioner: Provisioner,
    router: Router,
    tokens: TokenStore,
    oauth: Option<OAuthClient>,
    config: ManagerConfig,
}

impl BotManager {
    pub fn new(platform: Arc<dyn PlatformClient>, tokens: TokenStore, config: ManagerConfig) -> Self {
        let licenses = Arc::new(LicenseRegistry::new());
        let router = Router::new(
            Arc::clone(&licenses),
            Arc::clone(&platform),
            config.author_id.clone(),
        );
        let provisioner = Provisioner::new(Arc::clone(&platform), config.bot_name.clone());
        Self {
            licenses,
            platform,
            provisioner,
            router,
            tokens,
            oauth: None,
            config,
        }
    }

    /// Enable the OAuth callback flow.
    #[must_use]
    pub fn with_oauth(mut self, oauth: OAuthClient) -> Self {
        self.oauth = Some(oauth);
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn licenses(&self) -> &LicenseRegistry {
        &self.licenses
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Whether `secret` matches the secret webhooks were registered with.
    #[must_use]
    pub fn webhook_secret_matches(&self, secret: &str) -> bool {
        self.config.webhook_secret.expose_secret() == secret
    }

    /// Whether a push carrying `secret` (or none) may be dispatched.
    #[must_use]
    pub fn accepts_webhook_secret(&self, secret: Option<&str>) -> bool {
        match secret {
            Some(secret) => self.webhook_secret_matches(secret),
            None => !self.config.require_webhook_secret,
        }
    }

    /// Exchange an OAuth authorization code and publish the token, waking
    /// installs that wait for it.
    pub async fn authorize(&self, code: &str) -> Result<()> {
        let oauth = self.oauth.as_ref().ok_or(Error::NotConfigured {
            what: "OAuth code exchange",
        })?;
        let token = oauth.exchange_code(code).await?;
        self.tokens.set(token);
        info!("platform authorization complete");
        Ok(())
    }

    /// Install the app for `license_id`: provision agents and subscribe to
    /// pushes. Anything done before a failure is undone.
    pub async fn install_app(&self, license_id: LicenseId) -> Result<()> {
        let entry = Arc::new(LicenseEntry::new(license_id));
        self.licenses.install(Arc::clone(&entry))?;
        info!(%license_id, "installing app");

        match self.provision(&entry).await {
            Ok(()) if !self.licenses.is_installed(&entry) => {
                warn!(%license_id, "license uninstalled during install, releasing");
                if let Err(e) = self.platform.disable_license_webhooks().await {
                    warn!(%license_id, error = %e, "failed to disable license webhooks");
                }
                self.release(&entry).await;
                Err(Error::InstallCancelled { license_id })
            },
            Ok(()) => {
                info!(
                    %license_id,
                    agents = entry.agents().len(),
                    webhooks = entry.webhooks().len(),
                    "app installed"
                );
                Ok(())
            },
            Err(e) => {
                warn!(%license_id, error = %e, "install failed, rolling back");
                self.licenses.remove_entry(&entry);
                self.release(&entry).await;
                Err(e)
            },
        }
    }

    async fn provision(&self, entry: &LicenseEntry) -> Result<()> {
        tokio::time::timeout(self.config.install_timeout, self.tokens.ready())
            .await
            .map_err(|_| Error::Timeout {
                what: "platform authorization",
            })??;

        for id in self.provisioner.initialize().await? {
            if let Err(e) = entry.agents().register(Arc::new(AgentRecord::new(id))) {
                warn!(license_id = %entry.license_id(), error = %e, "skipping agent");
            }
        }

        for action in SUBSCRIBED_ACTIONS {
            let webhook = WebhookRegistration {
                action: action.to_string(),
                url: self.config.webhook_url(action),
                secret_key: self.config.webhook_secret.expose_secret().clone(),
                scope: WebhookScope::License,
            };
            let id = self.platform.register_webhook(&webhook).await?;
            info!(license_id = %entry.license_id(), action, webhook_id = %id, "webhook registered");
            entry.record_webhook(action, id);
        }

        self.platform.enable_license_webhooks().await?;
        Ok(())
    }

    /// Remove the app from `license_id`.
    ///
    /// Local teardown always runs; a failure to disable license webhooks is
    /// reported after it.
    pub async fn uninstall_app(&self, license_id: LicenseId) -> Result<()> {
        let entry = self
            .licenses
            .uninstall(license_id)
            .ok_or_else(|| Error::license_not_found(license_id))?;
        info!(%license_id, "uninstalling app");

        let disabled = self.platform.disable_license_webhooks().await;
        self.release(&entry).await;

        disabled?;
        info!(%license_id, "app uninstalled");
        Ok(())
    }

    /// Take agents offline and drop webhook subscriptions, concurrently.
    /// Failures are logged only.
    async fn release(&self, entry: &LicenseEntry) {
        let license_id = entry.license_id();
        let agents: Vec<AgentId> = entry
            .agents()
            .drain()
            .iter()
            .map(|a| a.id().clone())
            .collect();
        let webhooks = entry.take_webhooks();

        let unregister = join_all(webhooks.iter().map(|(action, id)| async move {
            if let Err(e) = self.platform.unregister_webhook(id).await {
                warn!(%license_id, action = %action, webhook_id = %id, error = %e, "failed to unregister webhook");
            }
        }));

        tokio::join!(self.provisioner.teardown(&agents), unregister);
    }

    /// Uninstall every license concurrently, then wait for background agent
    /// removals.
    pub async fn destroy(&self) {
        let ids = self.licenses.license_ids();
        info!(licenses = ids.len(), "shutting down bot manager");

        let results = join_all(ids.iter().map(|id| self.uninstall_app(*id))).await;
        for (id, result) in ids.iter().zip(results) {
            if let Err(e) = result {
                warn!(license_id = %id, error = %e, "uninstall during shutdown failed");
            }
        }

        self.provisioner.wait_for_cleanup().await;
    }
}
