//! Process-wide registry of per-user session memories.
//!
//! One worker process can host several simultaneous rooms, so the lookup
//! map is shared and guarded by a mutex. The individual memories stay
//! single-writer: each is only driven by the session that opened it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use gyanika_core::ConversationStore;

use crate::memory::{MemoryOptions, SessionMemory};

/// Shared handle to one user's session memory.
pub type MemoryHandle = Arc<Mutex<SessionMemory>>;

/// Mutex-guarded mapping from user identifier to session memory.
///
/// Created once at worker startup with an injected store; session handlers
/// receive it by reference instead of reaching for ambient globals.
pub struct MemoryRegistry {
    store: Arc<dyn ConversationStore>,
    options: MemoryOptions,
    inner: Mutex<HashMap<String, MemoryHandle>>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, options: MemoryOptions) -> Self {
        Self {
            store,
            options,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Reuse the user's existing memory, or open one if absent.
    pub async fn get_or_open(
        &self,
        user_id: &str,
        user_name: &str,
    ) -> anyhow::Result<MemoryHandle> {
        let mut map = self.inner.lock().await;
        if let Some(existing) = map.get(user_id) {
            return Ok(Arc::clone(existing));
        }

        let memory = self.open_memory(user_id, user_name).await?;
        map.insert(user_id.to_string(), Arc::clone(&memory));
        Ok(memory)
    }

    /// Open a fresh session memory, replacing any existing entry.
    ///
    /// Used when a user reconnects: the old entry (and its session) is
    /// dropped in favor of a new session record.
    pub async fn open_new(&self, user_id: &str, user_name: &str) -> anyhow::Result<MemoryHandle> {
        let memory = self.open_memory(user_id, user_name).await?;
        let mut map = self.inner.lock().await;
        if map
            .insert(user_id.to_string(), Arc::clone(&memory))
            .is_some()
        {
            info!(user_id, "replaced existing session memory");
        }
        Ok(memory)
    }

    /// Evict one user's memory, returning the handle if it was present.
    pub async fn remove(&self, user_id: &str) -> Option<MemoryHandle> {
        let removed = self.inner.lock().await.remove(user_id);
        if removed.is_some() {
            info!(user_id, "evicted session memory");
        }
        removed
    }

    /// Drop every registered memory.
    pub async fn clear(&self) {
        self.inner.lock().await.clear();
        info!("cleared all session memories");
    }

    /// Number of registered memories.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    async fn open_memory(&self, user_id: &str, user_name: &str) -> anyhow::Result<MemoryHandle> {
        let memory = SessionMemory::open(
            Arc::clone(&self.store),
            user_id,
            user_name,
            self.options.clone(),
        )
        .await?;
        Ok(Arc::new(Mutex::new(memory)))
    }
}
