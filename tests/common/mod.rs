#![allow(dead_code)]

use std::{
    collections::HashMap,
    future::Future,
    num::NonZeroU32,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use jikan_client::{
    JikanClient,
    services::{
        cache::{CacheClient, CacheError, CacheResult, MemoryCacheClient},
        rate_limit::RateLimitConfig,
        transport::{OriginResponse, Transport, TransportError},
    },
};
use reqwest::StatusCode;

/// Origin stub: canned responses per path, records every request.
#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, (StatusCode, String)>>,
    requests: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, status: StatusCode, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.into()));
    }

    pub fn ok(&self, path: &str, body: serde_json::Value) {
        self.route(path, StatusCode::OK, body.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|p| p.as_str() == path).count()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, path_and_query: &str) -> Result<OriginResponse, TransportError> {
        self.requests.lock().unwrap().push(path_and_query.to_string());

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let route = self.routes.lock().unwrap().get(path_and_query).cloned();
        match route {
            Some((status, body)) => Ok(OriginResponse::new(status, body)),
            None => Err(TransportError::Other(format!("connection refused: {path_and_query}"))),
        }
    }
}

/// Memory backend that counts calls and can slow reads down.
#[derive(Default)]
pub struct CountingCache {
    pub inner: MemoryCacheClient,
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
    pub bulk_sets: AtomicUsize,
    pub dels: AtomicUsize,
    get_delay: Mutex<Option<Duration>>,
}

impl CountingCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_get_delay(delay: Duration) -> Arc<Self> {
        let cache = Self::default();
        *cache.get_delay.lock().unwrap() = Some(delay);
        Arc::new(cache)
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheClient for CountingCache {
    fn backend_name(&self) -> &'static str {
        "counting"
    }

    async fn get_json(&self, key: &str) -> CacheResult<String> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get_json(key).await
    }

    async fn set_json_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set_json_with_ttl(key, value, ttl).await
    }

    async fn bulk_set_json_with_ttl(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> CacheResult<()> {
        self.bulk_sets.fetch_add(1, Ordering::SeqCst);
        self.inner.bulk_set_json_with_ttl(entries, ttl).await
    }

    async fn del(&self, key: &str) -> CacheResult<u64> {
        self.dels.fetch_add(1, Ordering::SeqCst);
        self.inner.del(key).await
    }
}

/// Backend that is unreachable for every operation.
#[derive(Default)]
pub struct BrokenCache {
    pub gets: AtomicUsize,
    pub sets: AtomicUsize,
}

impl BrokenCache {
    fn down() -> CacheError {
        CacheError::BackendConnection("connection refused".into())
    }
}

#[async_trait]
impl CacheClient for BrokenCache {
    fn backend_name(&self) -> &'static str {
        "broken"
    }

    async fn get_json(&self, _key: &str) -> CacheResult<String> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Err(Self::down())
    }

    async fn set_json_with_ttl(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        Err(Self::down())
    }

    async fn bulk_set_json_with_ttl(
        &self,
        _entries: &[(String, String)],
        _ttl: Duration,
    ) -> CacheResult<()> {
        Err(Self::down())
    }

    async fn del(&self, _key: &str) -> CacheResult<u64> {
        Err(Self::down())
    }
}

/// Quota loose enough that tests never wait on the limiter.
pub fn fast_rate_limit() -> RateLimitConfig {
    RateLimitConfig::new(
        NonZeroU32::new(100).unwrap(),
        NonZeroU32::new(60_000).unwrap(),
    )
}

pub fn cached_client(transport: Arc<StubTransport>, cache: Arc<dyn CacheClient>) -> JikanClient {
    JikanClient::builder()
        .transport(transport)
        .rate_limit(fast_rate_limit())
        .cache(cache)
        .build()
        .unwrap()
}

pub fn uncached_client(transport: Arc<StubTransport>) -> JikanClient {
    JikanClient::builder()
        .transport(transport)
        .rate_limit(fast_rate_limit())
        .build()
        .unwrap()
}

/// Polls `check` until it returns true, for deferred cache writes.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

pub fn anime_json(id: u32, title: &str) -> serde_json::Value {
    serde_json::json!({ "mal_id": id, "title": title })
}
