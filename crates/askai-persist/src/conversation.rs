use askai_types::{Message, Thread};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::error::Result;
use crate::keys::StorageKeys;
use crate::store::KeyValueStore;

/// Typed access to threads, per-thread messages and the current-thread pointer
///
/// No transaction spans two keys; callers must tolerate a thread index and
/// message blob that disagree after a crash.
#[derive(Clone)]
pub struct ConversationStore {
    store: Arc<dyn KeyValueStore>,
    keys: StorageKeys,
}

impl ConversationStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            keys: StorageKeys::default(),
        }
    }

    pub fn with_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn backend(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    pub async fn save_messages(&self, thread_id: &str, messages: &[Message]) -> Result<()> {
        self.write_json(&self.keys.messages(thread_id), messages).await
    }

    /// Messages of a thread; empty when nothing was stored
    pub async fn load_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .read_json(&self.keys.messages(thread_id))
            .await?
            .unwrap_or_default())
    }

    pub async fn clear_messages(&self, thread_id: &str) -> Result<()> {
        self.store.remove(&self.keys.messages(thread_id)).await
    }

    pub async fn save_threads(&self, threads: &[Thread]) -> Result<()> {
        self.write_json(&self.keys.threads(), threads).await
    }

    pub async fn load_threads(&self) -> Result<Vec<Thread>> {
        Ok(self.read_json(&self.keys.threads()).await?.unwrap_or_default())
    }

    pub async fn save_current_thread_id(&self, thread_id: &str) -> Result<()> {
        self.store
            .set(&self.keys.current_thread_id(), thread_id.to_string())
            .await
    }

    pub async fn load_current_thread_id(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(&self.keys.current_thread_id())
            .await?
            .filter(|id| !id.is_empty()))
    }
}
