//! Recording in-memory platform used by the routing tests.

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    lcbot_common::{AgentId, ChatId, SubscriptionId},
    lcbot_platform::{Error, PlatformClient, Result, RoutingStatus, WebhookRegistration},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateBot(String),
    DeleteBot(AgentId),
    ListBots(bool),
    SetRoutingStatus(AgentId, RoutingStatus),
    RegisterWebhook(String),
    UnregisterWebhook(SubscriptionId),
    EnableLicenseWebhooks,
    DisableLicenseWebhooks,
    TransferChat(ChatId, AgentId, bool),
    SendEvent(ChatId, AgentId, String),
}

type TransferHook = Arc<dyn Fn(&ChatId, &AgentId) + Send + Sync>;

/// `list_bots` returns the preset roster; `create_bot` does not extend it.
#[derive(Default)]
pub struct MockPlatform {
    calls: Mutex<Vec<Call>>,
    roster: Mutex<Vec<AgentId>>,
    failing_enable: Mutex<HashSet<AgentId>>,
    failing_ops: Mutex<HashSet<&'static str>>,
    transfer_error: Mutex<Option<String>>,
    on_transfer: Mutex<Option<TransferHook>>,
    next_id: AtomicUsize,
}

impl MockPlatform {
    pub fn with_bots(ids: &[&str]) -> Arc<Self> {
        let mock = Self::default();
        *mock.roster.lock().unwrap() = ids.iter().map(|id| AgentId::from(*id)).collect();
        Arc::new(mock)
    }

    pub fn fail_enable_for(&self, id: &str) {
        self.failing_enable.lock().unwrap().insert(AgentId::from(id));
    }

    /// Make every call of the named operation fail with a generic API error.
    pub fn fail_op(&self, op: &'static str) {
        self.failing_ops.lock().unwrap().insert(op);
    }

    pub fn transfer_fails_with(&self, message: &str) {
        *self.transfer_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn on_transfer(&self, hook: impl Fn(&ChatId, &AgentId) + Send + Sync + 'static) {
        *self.on_transfer.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, op: &'static str, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing_ops.lock().unwrap().contains(op) {
            return Err(api_error(&format!("{op} refused")));
        }
        Ok(())
    }
}

fn api_error(message: &str) -> Error {
    Error::Api {
        status: 422,
        kind: "validation".into(),
        message: message.into(),
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn create_bot(&self, name: &str) -> Result<AgentId> {
        self.record("create_bot", Call::CreateBot(name.to_string()))?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(AgentId::new(format!("created-{n}")))
    }

    async fn delete_bot(&self, agent: &AgentId) -> Result<()> {
        self.record("delete_bot", Call::DeleteBot(agent.clone()))
    }

    async fn list_bots(&self, all: bool) -> Result<Vec<AgentId>> {
        self.record("list_bots", Call::ListBots(all))?;
        Ok(self.roster.lock().unwrap().clone())
    }

    async fn set_routing_status(&self, agent: &AgentId, status: RoutingStatus) -> Result<()> {
        self.record(
            "set_routing_status",
            Call::SetRoutingStatus(agent.clone(), status),
        )?;
        if status == RoutingStatus::AcceptingChats
            && self.failing_enable.lock().unwrap().contains(agent)
        {
            return Err(api_error("agent cannot accept chats"));
        }
        Ok(())
    }

    async fn register_webhook(&self, webhook: &WebhookRegistration) -> Result<SubscriptionId> {
        self.record(
            "register_webhook",
            Call::RegisterWebhook(webhook.action.clone()),
        )?;
        Ok(SubscriptionId::new(format!("wh-{}", webhook.action)))
    }

    async fn unregister_webhook(&self, id: &SubscriptionId) -> Result<()> {
        self.record("unregister_webhook", Call::UnregisterWebhook(id.clone()))
    }

    async fn enable_license_webhooks(&self) -> Result<()> {
        self.record("enable_license_webhooks", Call::EnableLicenseWebhooks)
    }

    async fn disable_license_webhooks(&self) -> Result<()> {
        self.record("disable_license_webhooks", Call::DisableLicenseWebhooks)
    }

    async fn transfer_chat(&self, chat: &ChatId, target: &AgentId, force: bool) -> Result<()> {
        self.record(
            "transfer_chat",
            Call::TransferChat(chat.clone(), target.clone(), force),
        )?;
        let hook = self.on_transfer.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook(chat, target);
        }
        match self.transfer_error.lock().unwrap().as_deref() {
            Some(message) => Err(api_error(message)),
            None => Ok(()),
        }
    }

    async fn send_event(&self, chat: &ChatId, author: &AgentId, text: &str) -> Result<()> {
        self.record(
            "send_event",
            Call::SendEvent(chat.clone(), author.clone(), text.to_string()),
        )
    }
}
