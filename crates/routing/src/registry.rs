use std::sync::{Arc, Mutex, MutexGuard};

use {
    lcbot_common::{AgentId, ChatId},
    tracing::debug,
};

use crate::{
    agent::AgentRecord,
    error::{Error, Result},
};

/// Bot agents of one license, in registration order.
///
/// Every operation holds the registry lock for its whole duration and never
/// across an `.await`. Lookups return shared handles, so callers keep no
/// lock once a call returns.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Mutex<Vec<Arc<AgentRecord>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, agent: Arc<AgentRecord>) -> Result<()> {
        let mut agents = self.lock();
        if agents.iter().any(|a| a.id() == agent.id()) {
            return Err(Error::DuplicateAgent {
                agent_id: agent.id().clone(),
            });
        }
        debug!(agent_id = %agent.id(), "agent registered");
        agents.push(agent);
        Ok(())
    }

    /// Remove and return the agent with `id`, if registered.
    pub fn unregister(&self, id: &AgentId) -> Option<Arc<AgentRecord>> {
        let mut agents = self.lock();
        let pos = agents.iter().position(|a| a.id() == id)?;
        Some(agents.remove(pos))
    }

    pub fn find_by_id(&self, id: &AgentId) -> Option<Arc<AgentRecord>> {
        self.lock().iter().find(|a| a.id() == id).cloned()
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.lock().iter().any(|a| a.id() == id)
    }

    /// First agent, in registration order, that owns `chat`.
    pub fn find_by_chat(&self, chat: &ChatId) -> Result<Arc<AgentRecord>> {
        self.lock()
            .iter()
            .find(|a| a.owns_chat(chat))
            .cloned()
            .ok_or_else(|| Error::agent_not_found(chat))
    }

    /// First agent, in registration order, that could take `chat`: one with no
    /// chats at all or one not already owning it.
    pub fn find_by_chat_exclude(&self, chat: &ChatId) -> Result<Arc<AgentRecord>> {
        self.lock()
            .iter()
            .find(|a| a.chat_count() == 0 || !a.owns_chat(chat))
            .cloned()
            .ok_or_else(|| Error::agent_not_found(chat))
    }

    /// Make `agent` the sole owner of `chat`.
    ///
    /// Returns `false` without touching anything when `agent` is no longer
    /// registered, e.g. because teardown removed it mid-transfer.
    pub fn claim_chat(&self, agent: &AgentId, chat: &ChatId) -> bool {
        let agents = self.lock();
        let Some(owner) = agents.iter().find(|a| a.id() == agent) else {
            return false;
        };
        for other in agents.iter().filter(|a| a.id() != agent) {
            other.unregister_chat(chat);
        }
        owner.register_chats([chat.clone()]);
        true
    }

    /// Drop `chat` from whichever agent owns it and return that agent's id.
    pub fn release_chat(&self, chat: &ChatId) -> Option<AgentId> {
        let agents = self.lock();
        let mut released = None;
        for agent in agents.iter() {
            if agent.unregister_chat(chat) && released.is_none() {
                released = Some(agent.id().clone());
            }
        }
        released
    }

    /// Copy of the current records. Holds no lock after returning.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<AgentRecord>> {
        self.lock().clone()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<AgentId> {
        self.lock().iter().map(|a| a.id().clone()).collect()
    }

    /// Remove every record at once.
    pub fn drain(&self) -> Vec<Arc<AgentRecord>> {
        std::mem::take(&mut *self.lock())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<AgentRecord>>> {
        self.agents.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn registry(ids: &[&str]) -> AgentRegistry {
        let registry = AgentRegistry::new();
        for id in ids {
            registry.register(Arc::new(AgentRecord::new(*id))).unwrap();
        }
        registry
    }

    fn chat(id: &str) -> ChatId {
        ChatId::from(id)
    }

    fn agent(id: &str) -> AgentId {
        AgentId::from(id)
    }

    #[test]
    fn duplicate_register_keeps_one_entry() {
        let registry = registry(&["a"]);
        let err = registry
            .register(Arc::new(AgentRecord::new("a")))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateAgent { ref agent_id } if agent_id.as_str() == "a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn find_by_chat_follows_ownership() {
        let registry = registry(&["a", "b"]);
        let a = registry.find_by_id(&agent("a")).unwrap();
        a.register_chats([chat("c1")]);

        assert_eq!(registry.find_by_chat(&chat("c1")).unwrap().id(), &agent("a"));

        a.unregister_chat(&chat("c1"));
        assert!(matches!(
            registry.find_by_chat(&chat("c1")),
            Err(Error::AgentNotFound { .. })
        ));

        a.register_chats([chat("c1")]);
        registry.unregister(&agent("a"));
        assert!(registry.find_by_chat(&chat("c1")).is_err());
    }

    #[test]
    fn find_by_chat_exclude_skips_owner() {
        let registry = registry(&["x", "y"]);
        registry.claim_chat(&agent("x"), &chat("c1"));
        let picked = registry.find_by_chat_exclude(&chat("c1")).unwrap();
        assert_eq!(picked.id(), &agent("y"));
    }

    #[test]
    fn find_by_chat_exclude_prefers_registration_order() {
        let registry = registry(&["x", "y"]);
        registry.claim_chat(&agent("x"), &chat("c1"));
        let picked = registry.find_by_chat_exclude(&chat("c2")).unwrap();
        assert_eq!(picked.id(), &agent("x"));
    }

    #[test]
    fn find_by_chat_exclude_on_empty_registry() {
        let registry = AgentRegistry::new();
        assert!(matches!(
            registry.find_by_chat_exclude(&chat("c1")),
            Err(Error::AgentNotFound { ref chat_id }) if chat_id.as_str() == "c1"
        ));
    }

    #[test]
    fn find_by_chat_exclude_when_every_agent_owns_chat() {
        let registry = registry(&["x", "y"]);
        for a in registry.snapshot() {
            a.register_chats([chat("c1")]);
        }
        assert!(registry.find_by_chat_exclude(&chat("c1")).is_err());
    }

    #[test]
    fn unregister_unknown_is_none() {
        let registry = registry(&["a"]);
        assert!(registry.unregister(&agent("zz")).is_none());
        assert_eq!(registry.ids(), vec![agent("a")]);
    }

    #[test]
    fn claim_chat_moves_ownership() {
        let registry = registry(&["a", "b"]);
        assert!(registry.claim_chat(&agent("a"), &chat("c1")));
        assert!(registry.claim_chat(&agent("b"), &chat("c1")));

        let owners: Vec<_> = registry
            .snapshot()
            .into_iter()
            .filter(|a| a.owns_chat(&chat("c1")))
            .map(|a| a.id().clone())
            .collect();
        assert_eq!(owners, vec![agent("b")]);
    }

    #[test]
    fn claim_chat_for_missing_agent_changes_nothing() {
        let registry = registry(&["a"]);
        assert!(!registry.claim_chat(&agent("gone"), &chat("c1")));
        assert!(registry.find_by_chat(&chat("c1")).is_err());
    }

    #[test]
    fn release_chat_reports_owner() {
        let registry = registry(&["a", "b"]);
        registry.claim_chat(&agent("b"), &chat("c1"));
        assert_eq!(registry.release_chat(&chat("c1")), Some(agent("b")));
        assert_eq!(registry.release_chat(&chat("c1")), None);
    }

    #[test]
    fn snapshot_does_not_hold_lock() {
        let registry = registry(&["a"]);
        let snapshot = registry.snapshot();
        registry.register(Arc::new(AgentRecord::new("b"))).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn survives_poisoned_lock() {
        let registry = Arc::new(registry(&["a", "b"]));
        registry.claim_chat(&agent("a"), &chat("c1"));
        let poisoner = Arc::clone(&registry);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.agents.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert!(registry.agents.is_poisoned());

        registry.register(Arc::new(AgentRecord::new("c"))).unwrap();
        assert_eq!(registry.find_by_chat(&chat("c1")).unwrap().id(), &agent("a"));
        assert_eq!(registry.find_by_chat_exclude(&chat("c1")).unwrap().id(), &agent("b"));
        assert_eq!(registry.snapshot().len(), 3);
        assert_eq!(registry.ids(), vec![agent("a"), agent("b"), agent("c")]);
    }

    #[test]
    fn drain_empties_registry() {
        let registry = registry(&["a", "b"]);
        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn concurrent_registration_of_distinct_ids() {
        const N: usize = 64;
        let registry = AgentRegistry::new();
        std::thread::scope(|s| {
            for i in 0..N {
                let registry = &registry;
                s.spawn(move || {
                    registry
                        .register(Arc::new(AgentRecord::new(format!("bot-{i}"))))
                        .unwrap();
                });
            }
        });
        assert_eq!(registry.len(), N);
    }

    #[test]
    fn concurrent_claims_keep_single_owner() {
        let registry = registry(&["a", "b", "c", "d"]);
        std::thread::scope(|s| {
            for id in ["a", "b", "c", "d"] {
                let registry = &registry;
                s.spawn(move || {
                    for _ in 0..200 {
                        registry.claim_chat(&agent(id), &chat("hot"));
                    }
                });
            }
        });
        let owners = registry
            .snapshot()
            .iter()
            .filter(|a| a.owns_chat(&chat("hot")))
            .count();
        assert_eq!(owners, 1);
    }
}
