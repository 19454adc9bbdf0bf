//! Storage collaborator contract and an in-memory reference store.
//!
//! The pipeline never talks to a database directly; it consumes the two
//! operations of [`EntityStore`] and leaves everything else (transactions,
//! timeouts, retries) to the implementation. Store failures propagate
//! unchanged as [`CoreError::Store`](crate::error::CoreError::Store).

use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Retrieval and persistence collaborator for entities of type `E`.
#[async_trait]
pub trait EntityStore<E>: Send + Sync {
    /// Return the current persisted entity, or `None` when no entity exists
    /// under `key`.
    async fn get(&self, key: &str) -> CoreResult<Option<E>>;

    /// Persist the entity and return the canonical post-write
    /// representation, which may differ from the input (server-assigned
    /// fields, normalized content).
    async fn put(&self, key: &str, entity: E) -> CoreResult<E>;
}

/// A thread-safe in-memory store keyed by string, holding entities as JSON.
///
/// Intended for tests and examples; any [`Serialize`] +
/// [`DeserializeOwned`] entity type can be stored.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a raw JSON value.
    pub async fn seed(&self, key: impl Into<String>, value: Value) {
        self.entries.write().await.insert(key.into(), value);
    }

    /// The raw JSON currently stored under `key`, if any.
    pub async fn raw(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl<E> EntityStore<E> for InMemoryStore
where
    E: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> CoreResult<Option<E>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(value) => {
                let entity = serde_json::from_value(value.clone()).map_err(CoreError::Json)?;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, entity: E) -> CoreResult<E> {
        let value = serde_json::to_value(&entity)?;
        self.entries.write().await.insert(key.to_string(), value);
        Ok(entity)
    }
}
