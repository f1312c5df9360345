//! Baseline persistence collaborator: an async key-value store keyed by user id.

mod encrypted;

pub use encrypted::SecureStore;

use crate::baseline::UserBaseline;
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// `load` returns `Ok(None)` for users never seen (first run).
#[async_trait]
pub trait BaselineStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<UserBaseline>, StorageError>;
    async fn save(&self, user_id: &str, baseline: &UserBaseline) -> Result<(), StorageError>;
    async fn remove(&self, user_id: &str) -> Result<(), StorageError>;
}

/// In-process store; contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    baselines: RwLock<HashMap<String, UserBaseline>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.baselines.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.baselines.read().await.is_empty()
    }
}

#[async_trait]
impl BaselineStore for MemoryStore {
    async fn load(&self, user_id: &str) -> Result<Option<UserBaseline>, StorageError> {
        Ok(self.baselines.read().await.get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, baseline: &UserBaseline) -> Result<(), StorageError> {
        self.baselines
            .write()
            .await
            .insert(user_id.to_string(), baseline.clone());
        Ok(())
    }

    async fn remove(&self, user_id: &str) -> Result<(), StorageError> {
        self.baselines.write().await.remove(user_id);
        Ok(())
    }
}
