//! Cache backend interface used by the cache store (document get/set/delete with TTL).
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-layer errors (miss/transport/command/serialization).
///
/// Note:
/// - We keep this independent from `JikanError` so the read path can decide how
///   to fail (a broken cache degrades to an origin fetch, it never fails a call).
/// - `Clone` because one coalesced result is handed to every waiter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache miss")]
    NotFound,
    #[error("cache connection error: {0}")]
    BackendConnection(String),
    #[error("cache command error: {0}")]
    BackendCommand(String),
    #[error("cache value error: {0}")]
    InvalidValue(String),
}

impl CacheError {
    /// `true` for the expected "no entry" outcome.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }
}

/// A minimal document cache interface.
///
/// Values are JSON documents passed as text; the backend stores them without
/// interpreting their structure.
/// - `set_json_with_ttl` must apply value and expiry as one unit.
/// - `bulk_set_json_with_ttl` is all-or-nothing from the caller's point of view.
#[async_trait]
pub trait CacheClient: Send + Sync + 'static {
    // Returns the cache backend name (for logging).
    fn backend_name(&self) -> &'static str;

    // Get a JSON document. A missing or expired key is `CacheError::NotFound`.
    async fn get_json(&self, key: &str) -> CacheResult<String>;

    // Overwrite a JSON document together with its TTL.
    async fn set_json_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    // Overwrite many documents in one batch, all with the same TTL.
    async fn bulk_set_json_with_ttl(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> CacheResult<()>;

    // Delete a key. Returns number of deleted keys (0 when it did not exist).
    async fn del(&self, key: &str) -> CacheResult<u64>;
}

/// Default TTL for every entry written by this crate.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest TTL accepted anywhere in the crate.
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
