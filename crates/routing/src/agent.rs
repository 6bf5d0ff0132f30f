use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard},
};

use lcbot_common::{AgentId, ChatId};

/// One bot agent and the chats it currently owns.
///
/// The chat set has its own lock, independent of the registry that holds the
/// record. Registry code may take it while holding the registry lock, never
/// the other way round.
#[derive(Debug)]
pub struct AgentRecord {
    id: AgentId,
    chats: Mutex<HashSet<ChatId>>,
}

impl AgentRecord {
    pub fn new(id: impl Into<AgentId>) -> Self {
        Self {
            id: id.into(),
            chats: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Union-merge `ids` into the owned set. Repeats collapse.
    pub fn register_chats<I>(&self, ids: I)
    where
        I: IntoIterator<Item = ChatId>,
    {
        self.lock().extend(ids);
    }

    /// Drop `id` from the owned set. Returns whether it was there.
    pub fn unregister_chat(&self, id: &ChatId) -> bool {
        self.lock().remove(id)
    }

    #[must_use]
    pub fn owns_chat(&self, id: &ChatId) -> bool {
        self.lock().contains(id)
    }

    #[must_use]
    pub fn chat_count(&self) -> usize {
        self.lock().len()
    }

    /// Owned chats, sorted.
    #[must_use]
    pub fn chats(&self) -> Vec<ChatId> {
        let mut chats: Vec<ChatId> = self.lock().iter().cloned().collect();
        chats.sort();
        chats
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ChatId>> {
        self.chats.lock().unwrap_or_else(|e| e.into_inner())
    }
}
