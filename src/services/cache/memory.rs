//! In-process cache backend with TTL expiry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult};

/// Entry in the memory cache.
struct MemoryEntry {
    document: String,
    expires_at: Instant,
}

/// Writes between two sweeps of expired entries.
const PURGE_EVERY: usize = 128;

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, MemoryEntry>,
    writes_since_purge: usize,
}

impl MemoryState {
    fn insert(&mut self, key: String, document: String, expires_at: Instant) {
        self.entries.insert(
            key,
            MemoryEntry {
                document,
                expires_at,
            },
        );
    }

    // Keys written by fan-out are often never read again, so expiry on read
    // alone would let them pile up.
    fn record_writes(&mut self, count: usize) {
        self.writes_since_purge += count;
        if self.writes_since_purge >= PURGE_EVERY {
            self.writes_since_purge = 0;
            let now = Instant::now();
            self.entries.retain(|_, e| e.expires_at > now);
        }
    }
}

/// Map-backed cache. Expired entries are dropped on read and swept every
/// [`PURGE_EVERY`] writes.
#[derive(Default)]
pub struct MemoryCacheClient {
    state: Mutex<MemoryState>,
}

impl MemoryCacheClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| CacheError::BackendCommand(format!("lock poisoned: {}", e)))
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .map(|s| s.entries.values().filter(|e| e.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn stored(&self) -> usize {
        self.lock().map(|s| s.entries.len()).unwrap_or(0)
    }
}

fn expiry(ttl: Duration) -> CacheResult<Instant> {
    Instant::now()
        .checked_add(ttl)
        .ok_or_else(|| CacheError::InvalidValue(format!("ttl out of range: {:?}", ttl)))
}

impl std::fmt::Debug for MemoryCacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl CacheClient for MemoryCacheClient {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get_json(&self, key: &str) -> CacheResult<String> {
        let mut state = self.lock()?;

        if let Some(entry) = state.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Ok(entry.document.clone());
            }
            state.entries.remove(key);
        }

        Err(CacheError::NotFound)
    }

    async fn set_json_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let expires_at = expiry(ttl)?;
        let mut state = self.lock()?;
        state.insert(key.to_string(), value.to_string(), expires_at);
        state.record_writes(1);
        Ok(())
    }

    async fn bulk_set_json_with_ttl(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> CacheResult<()> {
        let expires_at = expiry(ttl)?;
        let mut state = self.lock()?;
        for (key, value) in entries {
            state.insert(key.clone(), value.clone(), expires_at);
        }
        state.record_writes(entries.len());
        Ok(())
    }

    async fn del(&self, key: &str) -> CacheResult<u64> {
        let mut state = self.lock()?;
        Ok(state.entries.remove(key).map_or(0, |_| 1))
    }
}
