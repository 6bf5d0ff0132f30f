use std::sync::Arc;

use {
    futures::future::join_all,
    lcbot_common::AgentId,
    lcbot_platform::{PlatformClient, RoutingStatus},
    tokio_util::task::TaskTracker,
    tracing::{debug, info, warn},
};

use crate::error::{Error, Result};

/// Creates, enables and retires bot agents on the platform.
pub struct Provisioner {
    platform: Arc<dyn PlatformClient>,
    bot_name: String,
    cleanup: TaskTracker,
}

impl Provisioner {
    pub fn new(platform: Arc<dyn PlatformClient>, bot_name: impl Into<String>) -> Self {
        Self {
            platform,
            bot_name: bot_name.into(),
            cleanup: TaskTracker::new(),
        }
    }

    /// Create this app's bot, then enable every bot on the license for
    /// routing.
    ///
    /// Bots that refuse to go online are excluded and deleted in the
    /// background. Fails with [`Error::NoAgentsAvailable`] when nothing could
    /// be enabled.
    pub async fn initialize(&self) -> Result<Vec<AgentId>> {
        let created = self.platform.create_bot(&self.bot_name).await?;
        info!(agent_id = %created, name = %self.bot_name, "bot agent created");

        let bots = self.platform.list_bots(true).await?;
        if bots.is_empty() {
            return Err(Error::NoAgentsAvailable);
        }

        let results = join_all(bots.iter().map(|id| async move {
            self.platform
                .set_routing_status(id, RoutingStatus::AcceptingChats)
                .await
        }))
        .await;

        let mut enabled = Vec::with_capacity(bots.len());
        for (id, result) in bots.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    debug!(agent_id = %id, "agent accepting chats");
                    enabled.push(id);
                },
                Err(e) => {
                    warn!(agent_id = %id, error = %e, "failed to enable agent, removing it");
                    self.schedule_removal(id);
                },
            }
        }

        if enabled.is_empty() {
            return Err(Error::NoAgentsAvailable);
        }
        info!(count = enabled.len(), "agents enabled");
        Ok(enabled)
    }

    /// Take every agent offline concurrently. Failures are logged only.
    pub async fn teardown(&self, agents: &[AgentId]) {
        let results = join_all(agents.iter().map(|id| async move {
            (
                id,
                self.platform
                    .set_routing_status(id, RoutingStatus::Offline)
                    .await,
            )
        }))
        .await;

        for (id, result) in results {
            if let Err(e) = result {
                warn!(agent_id = %id, error = %e, "failed to take agent offline");
            }
        }
    }

    /// Delete `agent` in the background. The caller does not wait.
    pub fn schedule_removal(&self, agent: AgentId) {
        let platform = Arc::clone(&self.platform);
        self.cleanup.spawn(async move {
            match platform.delete_bot(&agent).await {
                Ok(()) => debug!(agent_id = %agent, "agent removed"),
                Err(e) => warn!(agent_id = %agent, error = %e, "failed to remove agent"),
            }
        });
    }

    /// Wait for every background removal scheduled so far.
    pub async fn wait_for_cleanup(&self) {
        self.cleanup.close();
        self.cleanup.wait().await;
        self.cleanup.reopen();
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_support::{Call, MockPlatform};

    fn agent(id: &str) -> AgentId {
        AgentId::from(id)
    }

    #[tokio::test]
    async fn enables_every_listed_bot() {
        let mock = MockPlatform::with_bots(&["a", "b"]);
        let provisioner = Provisioner::new(mock.clone(), "Helper");

        let enabled = provisioner.initialize().await.unwrap();
        assert_eq!(enabled, vec![agent("a"), agent("b")]);

        let calls = mock.calls();
        assert_eq!(calls[0], Call::CreateBot("Helper".into()));
        assert_eq!(calls[1], Call::ListBots(true));
        assert_eq!(
            mock.count(|c| matches!(
                c,
                Call::SetRoutingStatus(_, RoutingStatus::AcceptingChats)
            )),
            2
        );
    }

    #[tokio::test]
    async fn prunes_agent_that_fails_to_enable() {
        let mock = MockPlatform::with_bots(&["a", "b"]);
        mock.fail_enable_for("b");
        let provisioner = Provisioner::new(mock.clone(), "Helper");

        let enabled = provisioner.initialize().await.unwrap();
        assert_eq!(enabled, vec![agent("a")]);

        provisioner.wait_for_cleanup().await;
        assert_eq!(mock.count(|c| *c == Call::DeleteBot(agent("b"))), 1);
        assert_eq!(mock.count(|c| matches!(c, Call::DeleteBot(_))), 1);
    }

    #[tokio::test]
    async fn empty_roster_is_an_error() {
        let mock = MockPlatform::with_bots(&[]);
        let provisioner = Provisioner::new(mock.clone(), "Helper");
        assert!(matches!(
            provisioner.initialize().await,
            Err(Error::NoAgentsAvailable)
        ));
    }

    #[tokio::test]
    async fn all_enable_failures_is_an_error() {
        let mock = MockPlatform::with_bots(&["a"]);
        mock.fail_enable_for("a");
        let provisioner = Provisioner::new(mock.clone(), "Helper");
        assert!(matches!(
            provisioner.initialize().await,
            Err(Error::NoAgentsAvailable)
        ));
        provisioner.wait_for_cleanup().await;
        assert_eq!(mock.count(|c| matches!(c, Call::DeleteBot(_))), 1);
    }

    #[tokio::test]
    async fn create_failure_is_fatal() {
        let mock = MockPlatform::with_bots(&["a"]);
        mock.fail_op("create_bot");
        let provisioner = Provisioner::new(mock.clone(), "Helper");
        assert!(matches!(
            provisioner.initialize().await,
            Err(Error::PlatformCallFailed(_))
        ));
        assert_eq!(mock.count(|c| matches!(c, Call::ListBots(_))), 0);
    }

    #[tokio::test]
    async fn teardown_swallows_failures() {
        let mock = MockPlatform::with_bots(&[]);
        mock.fail_op("set_routing_status");
        let provisioner = Provisioner::new(mock.clone(), "Helper");

        provisioner.teardown(&[agent("a"), agent("b")]).await;
        assert_eq!(
            mock.count(|c| matches!(c, Call::SetRoutingStatus(_, RoutingStatus::Offline))),
            2
        );
    }
}
