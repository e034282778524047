use async_trait::async_trait;
use std::time::Duration;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult};

/// Valkey/Redis-backed document cache.
///
/// Uses JSON module commands only (`JSON.GET`/`JSON.SET`/`JSON.DEL`), so the
/// server must have RedisJSON (or Valkey's JSON module) loaded.
#[derive(Clone)]
pub struct ValkeyClient {
    manager: redis::aio::ConnectionManager,
}

impl ValkeyClient {
    // Create a Valkey client from a URL like `redis://localhost:6379`
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        Ok(Self { manager })
    }

    // Reuse a connection manager owned by the application.
    pub fn from_manager(manager: redis::aio::ConnectionManager) -> Self {
        Self { manager }
    }
}

impl std::fmt::Debug for ValkeyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValkeyClient").finish_non_exhaustive()
    }
}

// EXPIRE expects integer seconds. We clamp to at least 1 sec.
fn expire_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

// `JSON.GET key $` answers with a JSON array of every match for the path;
// the root path matches exactly once.
fn unwrap_root(raw: &str) -> CacheResult<String> {
    let matches: Vec<serde_json::Value> =
        serde_json::from_str(raw).map_err(|e| CacheError::InvalidValue(e.to_string()))?;

    match matches.into_iter().next() {
        Some(doc) => Ok(doc.to_string()),
        None => Err(CacheError::NotFound),
    }
}

#[async_trait]
impl CacheClient for ValkeyClient {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn get_json(&self, key: &str) -> CacheResult<String> {
        // Use a clone of the connection manager
        let mut conn = self.manager.clone();

        let resp: Option<String> = redis::cmd("JSON.GET")
            .arg(key)
            .arg("$")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        match resp {
            Some(raw) => unwrap_root(&raw),
            None => Err(CacheError::NotFound),
        }
    }

    async fn set_json_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.manager.clone();

        // MULTI / JSON.SET / EXPIRE / EXEC: the document never exists without its TTL.
        redis::pipe()
            .atomic()
            .cmd("JSON.SET")
            .arg(key)
            .arg("$")
            .arg(value)
            .ignore()
            .cmd("EXPIRE")
            .arg(key)
            .arg(expire_seconds(ttl))
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))
    }

    async fn bulk_set_json_with_ttl(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.manager.clone();
        let seconds = expire_seconds(ttl);

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.cmd("JSON.SET").arg(key).arg("$").arg(value).ignore();
            pipe.cmd("EXPIRE").arg(key).arg(seconds).ignore();
        }

        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))
    }

    async fn del(&self, key: &str) -> CacheResult<u64> {
        let mut conn = self.manager.clone();

        // JSON.DEL returns number of paths removed (0 for a missing key).
        let n: u64 = redis::cmd("JSON.DEL")
            .arg(key)
            .arg("$")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        Ok(n)
    }
}
