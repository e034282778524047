//! Typed, prefix-namespaced cache store on top of a [`CacheClient`].
//!
//! Reads (`get`) and deletes are coalesced per key; writes are blind
//! overwrites and go straight to the backend. The `deferred_*` variants run
//! on a detached task and only log their failures.
use std::{sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::keys::CacheKey;
use crate::services::cache::{
    client::{CacheClient, CacheError, CacheResult},
    coalesce::Coalescer,
};

pub const DEFAULT_PREFIX: &str = "jikan";

#[derive(Clone)]
pub struct CacheStore {
    client: Arc<dyn CacheClient>,
    // Key prefix to avoid collisions with other users of the same backend
    prefix: String,
    gets: Coalescer<String>,
    deletes: Coalescer<u64>,
}

impl CacheStore {
    pub fn new(client: Arc<dyn CacheClient>) -> Self {
        Self::new_with_prefix(client, DEFAULT_PREFIX)
    }

    pub fn new_with_prefix(client: Arc<dyn CacheClient>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            gets: Coalescer::new(),
            deletes: Coalescer::new(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.client.backend_name()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn key(&self, key: &CacheKey) -> String {
        format!("{}:{}", self.prefix, key)
    }

    /// Reads and decodes one document. `CacheError::NotFound` is a plain miss.
    pub async fn get<T>(&self, key: &CacheKey) -> CacheResult<T>
    where
        T: DeserializeOwned,
    {
        let full_key = self.key(key);
        let client = self.client.clone();
        let owned_key = full_key.clone();

        let doc = self
            .gets
            .run(&full_key, move || async move { client.get_json(&owned_key).await })
            .await?;

        serde_json::from_str(&doc).map_err(|e| CacheError::InvalidValue(e.to_string()))
    }

    pub async fn set<T>(&self, key: &CacheKey, value: &T, ttl: Duration) -> CacheResult<()>
    where
        T: Serialize + ?Sized,
    {
        let doc = encode(value)?;
        self.client
            .set_json_with_ttl(&self.key(key), &doc, ttl)
            .await
    }

    /// Same effect as [`set`](Self::set) without waiting for it. Failures are
    /// logged and otherwise dropped.
    pub fn deferred_set<T>(&self, key: &CacheKey, value: &T, ttl: Duration)
    where
        T: Serialize + ?Sized,
    {
        let doc = match encode(value) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(key = %key, error = %e, "skipping deferred cache write");
                return;
            }
        };

        let client = self.client.clone();
        let full_key = self.key(key);
        tokio::spawn(async move {
            match client.set_json_with_ttl(&full_key, &doc, ttl).await {
                Ok(()) => debug!(key = %full_key, "deferred cache write done"),
                Err(e) => warn!(key = %full_key, error = %e, "deferred cache write failed"),
            }
        });
    }

    /// Writes every pair as one batch. Any failure fails the whole batch.
    pub async fn bulk_set<T>(&self, entries: &[(CacheKey, T)], ttl: Duration) -> CacheResult<()>
    where
        T: Serialize,
    {
        let docs = self.encode_batch(entries)?;
        self.client.bulk_set_json_with_ttl(&docs, ttl).await
    }

    pub fn deferred_bulk_set<T>(&self, entries: &[(CacheKey, T)], ttl: Duration)
    where
        T: Serialize,
    {
        let docs = match self.encode_batch(entries) {
            Ok(docs) if docs.is_empty() => return,
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "skipping deferred bulk cache write");
                return;
            }
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            let count = docs.len();
            match client.bulk_set_json_with_ttl(&docs, ttl).await {
                Ok(()) => debug!(count, "deferred bulk cache write done"),
                Err(e) => warn!(count, error = %e, "deferred bulk cache write failed"),
            }
        });
    }

    /// Removes an entry; a missing key is not an error.
    pub async fn delete(&self, key: &CacheKey) -> CacheResult<()> {
        let full_key = self.key(key);
        let client = self.client.clone();
        let owned_key = full_key.clone();

        self.deletes
            .run(&full_key, move || async move { client.del(&owned_key).await })
            .await?;
        Ok(())
    }

    fn encode_batch<T: Serialize>(
        &self,
        entries: &[(CacheKey, T)],
    ) -> CacheResult<Vec<(String, String)>> {
        entries
            .iter()
            .map(|(key, value)| Ok((self.key(key), encode(value)?)))
            .collect()
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.client.backend_name())
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> CacheResult<String> {
    serde_json::to_string(value).map_err(|e| CacheError::InvalidValue(e.to_string()))
}
