//! In-process registry store.
//!
//! Keeps the serialized registry in memory so loads and saves behave like a
//! real store. Failures can be scheduled to exercise the save retry path.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use birdnest_core::ViolatorRegistry;

use super::{RegistryStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Option<Vec<u8>>>,
    failing_saves: AtomicU32,
    saves: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing registry.
    pub fn with_registry(registry: &ViolatorRegistry) -> Result<Self, StoreError> {
        Ok(Self::with_raw(serde_json::to_vec(registry)?))
    }

    /// Store seeded with raw bytes, which need not be valid.
    pub fn with_raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            document: Mutex::new(Some(bytes.into())),
            ..Self::default()
        }
    }

    /// Make the next `count` saves fail.
    pub fn fail_next_saves(&self, count: u32) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Current stored bytes, if any save or seed happened.
    pub async fn raw(&self) -> Option<Vec<u8>> {
        self.document.lock().await.clone()
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn load(&self) -> Result<ViolatorRegistry, StoreError> {
        match self.document.lock().await.as_deref() {
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
            None => Ok(ViolatorRegistry::new()),
        }
    }

    async fn save(&self, registry: &ViolatorRegistry) -> Result<(), StoreError> {
        let pending = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if pending.is_ok() {
            return Err(StoreError::Unavailable("scheduled save failure".to_string()));
        }

        let bytes = serde_json::to_vec(registry)?;
        *self.document.lock().await = Some(bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_until_saved() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());
        assert!(store.raw().await.is_none());

        store.save(&ViolatorRegistry::new()).await.unwrap();
        assert_eq!(store.raw().await.as_deref(), Some(&b"{}"[..]));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn scheduled_failures_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next_saves(2);

        assert!(store.save(&ViolatorRegistry::new()).await.is_err());
        assert!(store.save(&ViolatorRegistry::new()).await.is_err());
        assert!(store.save(&ViolatorRegistry::new()).await.is_ok());
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn garbage_reports_corruption() {
        let store = MemoryStore::with_raw("not json");
        assert!(matches!(store.load().await, Err(StoreError::Serde(_))));
    }
}
