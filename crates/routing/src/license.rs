use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use lcbot_common::{LicenseId, SubscriptionId};

use crate::{
    error::{Error, Result},
    registry::AgentRegistry,
};

/// State kept for one installed license.
#[derive(Debug)]
pub struct LicenseEntry {
    license_id: LicenseId,
    agents: AgentRegistry,
    webhooks: Mutex<HashMap<String, SubscriptionId>>,
}

impl LicenseEntry {
    pub fn new(license_id: LicenseId) -> Self {
        Self {
            license_id,
            agents: AgentRegistry::new(),
            webhooks: Mutex::new(HashMap::new()),
        }
    }

    pub fn license_id(&self) -> LicenseId {
        self.license_id
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// Remember the subscription id for `action` so uninstall can remove it.
    pub fn record_webhook(&self, action: impl Into<String>, id: SubscriptionId) {
        self.lock_webhooks().insert(action.into(), id);
    }

    #[must_use]
    pub fn webhooks(&self) -> Vec<(String, SubscriptionId)> {
        let mut hooks: Vec<_> = self
            .lock_webhooks()
            .iter()
            .map(|(action, id)| (action.clone(), id.clone()))
            .collect();
        hooks.sort();
        hooks
    }

    /// Remove and return every recorded subscription.
    pub fn take_webhooks(&self) -> Vec<(String, SubscriptionId)> {
        let mut hooks: Vec<_> = self.lock_webhooks().drain().collect();
        hooks.sort();
        hooks
    }

    fn lock_webhooks(&self) -> MutexGuard<'_, HashMap<String, SubscriptionId>> {
        self.webhooks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Installed licenses keyed by license id.
///
/// Its lock is independent of every per-license lock and is never held while
/// calling into an entry.
#[derive(Debug, Default)]
pub struct LicenseRegistry {
    entries: Mutex<HashMap<LicenseId, Arc<LicenseEntry>>>,
}

impl LicenseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, entry: Arc<LicenseEntry>) -> Result<()> {
        let mut entries = self.lock();
        let license_id = entry.license_id();
        if entries.contains_key(&license_id) {
            return Err(Error::DuplicateLicense { license_id });
        }
        entries.insert(license_id, entry);
        Ok(())
    }

    pub fn uninstall(&self, license_id: LicenseId) -> Option<Arc<LicenseEntry>> {
        self.lock().remove(&license_id)
    }

    /// Remove `entry` only if it is still the one installed under its id.
    pub fn remove_entry(&self, entry: &Arc<LicenseEntry>) -> bool {
        let mut entries = self.lock();
        match entries.get(&entry.license_id()) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                entries.remove(&entry.license_id());
                true
            },
            _ => false,
        }
    }

    /// Whether `entry` is the one currently installed under its id.
    #[must_use]
    pub fn is_installed(&self, entry: &Arc<LicenseEntry>) -> bool {
        self.lock()
            .get(&entry.license_id())
            .is_some_and(|current| Arc::ptr_eq(current, entry))
    }

    pub fn find(&self, license_id: LicenseId) -> Result<Arc<LicenseEntry>> {
        self.lock()
            .get(&license_id)
            .cloned()
            .ok_or_else(|| Error::license_not_found(license_id))
    }

    /// Installed license ids, sorted.
    #[must_use]
    pub fn license_ids(&self) -> Vec<LicenseId> {
        let mut ids: Vec<_> = self.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn drain(&self) -> Vec<Arc<LicenseEntry>> {
        self.lock().drain().map(|(_, entry)| entry).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LicenseId, Arc<LicenseEntry>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u64) -> Arc<LicenseEntry> {
        Arc::new(LicenseEntry::new(LicenseId(id)))
    }

    #[test]
    fn install_rejects_duplicate() {
        let registry = LicenseRegistry::new();
        registry.install(entry(1)).unwrap();
        let err = registry.install(entry(1)).unwrap_err();
        assert!(matches!(err, Error::DuplicateLicense { license_id } if license_id == LicenseId(1)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn find_and_uninstall() {
        let registry = LicenseRegistry::new();
        registry.install(entry(7)).unwrap();
        assert_eq!(registry.find(LicenseId(7)).unwrap().license_id(), LicenseId(7));

        assert!(registry.uninstall(LicenseId(7)).is_some());
        assert!(registry.uninstall(LicenseId(7)).is_none());
        assert!(matches!(
            registry.find(LicenseId(7)),
            Err(Error::LicenseNotFound { .. })
        ));
    }

    #[test]
    fn remove_entry_ignores_replacement() {
        let registry = LicenseRegistry::new();
        let first = entry(3);
        registry.install(Arc::clone(&first)).unwrap();
        registry.uninstall(LicenseId(3));
        let second = entry(3);
        registry.install(Arc::clone(&second)).unwrap();

        assert!(!registry.remove_entry(&first));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_installed(&first));
        assert!(registry.is_installed(&second));
        assert!(registry.remove_entry(&second));
        assert!(registry.is_empty());
    }

    #[test]
    fn webhooks_are_recorded_and_taken() {
        let entry = entry(1);
        entry.record_webhook("incoming_chat", SubscriptionId::from("w1"));
        entry.record_webhook("incoming_event", SubscriptionId::from("w2"));
        assert_eq!(entry.webhooks().len(), 2);

        let taken = entry.take_webhooks();
        assert_eq!(taken[0], ("incoming_chat".to_string(), SubscriptionId::from("w1")));
        assert!(entry.webhooks().is_empty());
    }

    #[test]
    fn license_ids_are_sorted() {
        let registry = LicenseRegistry::new();
        for id in [9, 2, 5] {
            registry.install(entry(id)).unwrap();
        }
        assert_eq!(registry.license_ids(), vec![LicenseId(2), LicenseId(5), LicenseId(9)]);
        assert_eq!(registry.drain().len(), 3);
        assert!(registry.is_empty());
    }
}
