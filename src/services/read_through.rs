//! Cache-aside read path.
//!
//! cache `get` (coalesced) → on miss: rate limiter → origin → decode →
//! deferred cache write (+ per-item fan-out for collections).
//!
//! Cache trouble never fails a call: a broken backend reads as a miss and a
//! failed write is only logged. Origin trouble always reaches the caller, and
//! nothing is retried.
use std::{sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{JikanError, Result};
use crate::keys::{CacheKey, Keyed};
use crate::models::{ApiErrorBody, Page, ResponseBody};
use crate::services::cache::{CacheError, CachePolicy, CacheStore};
use crate::services::rate_limit::RateLimiter;
use crate::services::transport::{OriginResponse, ResponseMeta, Transport};

/// Where a [`FetchResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    CacheHit,
    OriginFetch,
}

/// Payload of one logical fetch.
///
/// `meta` is only present for origin fetches: a cache hit makes no network call.
#[derive(Debug, Clone)]
pub struct FetchResult<T> {
    pub data: T,
    pub origin: Origin,
    pub meta: Option<ResponseMeta>,
}

impl<T> FetchResult<T> {
    fn cached(data: T) -> Self {
        Self {
            data,
            origin: Origin::CacheHit,
            meta: None,
        }
    }

    fn fetched(data: T, meta: ResponseMeta) -> Self {
        Self {
            data,
            origin: Origin::OriginFetch,
            meta: Some(meta),
        }
    }

    pub fn is_cached(&self) -> bool {
        self.origin == Origin::CacheHit
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchResult<U> {
        FetchResult {
            data: f(self.data),
            origin: self.origin,
            meta: self.meta,
        }
    }
}

#[derive(Clone)]
pub struct ReadThrough {
    transport: Arc<dyn Transport>,
    limiter: Arc<RateLimiter>,
    cache: CachePolicy,
}

impl ReadThrough {
    pub fn new(
        transport: Arc<dyn Transport>,
        limiter: Arc<RateLimiter>,
        cache: CachePolicy,
    ) -> Self {
        Self {
            transport,
            limiter,
            cache,
        }
    }

    pub fn cache(&self) -> &CachePolicy {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Single-resource fetch. The origin body is `{ "data": T }`; the cache
    /// holds the bare `T`.
    pub async fn fetch_one<T>(
        &self,
        ctx: &Context,
        key: &CacheKey,
        path: &str,
    ) -> Result<FetchResult<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        if let Some(hit) = self.lookup::<T>(ctx, key).await? {
            return Ok(FetchResult::cached(hit));
        }

        let (body, meta) = self.fetch_origin::<ResponseBody<T>>(ctx, path).await?;

        if let CachePolicy::Enabled { store, ttl } = &self.cache {
            store.deferred_set(key, &body.data, *ttl);
        }

        Ok(FetchResult::fetched(body.data, meta))
    }

    /// Collection fetch. The page is cached under `key`, and every item is
    /// also written under its own entity key so later single-item fetches hit.
    pub async fn fetch_page<T>(
        &self,
        ctx: &Context,
        key: &CacheKey,
        path: &str,
    ) -> Result<FetchResult<Page<T>>>
    where
        T: Keyed + Serialize + DeserializeOwned,
    {
        if let Some(hit) = self.lookup::<Page<T>>(ctx, key).await? {
            return Ok(FetchResult::cached(hit));
        }

        let (page, meta) = self.fetch_origin::<Page<T>>(ctx, path).await?;

        if let CachePolicy::Enabled { store, ttl } = &self.cache {
            store.deferred_set(key, &page, *ttl);
            fan_out(store, &page.data, *ttl);
        }

        Ok(FetchResult::fetched(page, meta))
    }

    /// Drops one entry. A no-op when caching is disabled.
    pub async fn invalidate(&self, key: &CacheKey) -> std::result::Result<(), CacheError> {
        match &self.cache {
            CachePolicy::Enabled { store, .. } => store.delete(key).await,
            CachePolicy::Disabled => Ok(()),
        }
    }

    async fn lookup<T>(&self, ctx: &Context, key: &CacheKey) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let CachePolicy::Enabled { store, .. } = &self.cache else {
            return Ok(None);
        };

        match ctx.run(store.get::<T>(key)).await? {
            Ok(value) => {
                debug!(key = %key, "cache hit");
                Ok(Some(value))
            }
            Err(CacheError::NotFound) => {
                debug!(key = %key, "cache miss");
                Ok(None)
            }
            Err(e) => {
                warn!(
                    key = %key,
                    backend = store.backend_name(),
                    error = %e,
                    "cache read failed, falling back to origin"
                );
                Ok(None)
            }
        }
    }

    async fn fetch_origin<B>(&self, ctx: &Context, path: &str) -> Result<(B, ResponseMeta)>
    where
        B: DeserializeOwned,
    {
        self.limiter.acquire(ctx).await?;

        debug!(path, "origin fetch");
        let resp = ctx.run(self.transport.get(path)).await??;

        if !resp.meta.status.is_success() {
            return Err(status_error(&resp));
        }

        let body = serde_json::from_slice(&resp.body)?;
        Ok((body, resp.meta))
    }
}

impl std::fmt::Debug for ReadThrough {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadThrough")
            .field("limiter", &self.limiter)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Indexes every item of a collection under its own entity key, as one
/// deferred batch.
fn fan_out<T>(store: &CacheStore, items: &[T], ttl: Duration)
where
    T: Keyed + Serialize,
{
    let entries: Vec<(CacheKey, &T)> = items.iter().map(|item| (item.cache_key(), item)).collect();
    debug!(count = entries.len(), "indexing collection items");
    store.deferred_bulk_set(&entries, ttl);
}

fn status_error(resp: &OriginResponse) -> JikanError {
    let status = resp.meta.status;
    let body: ApiErrorBody = serde_json::from_slice(&resp.body).unwrap_or_default();

    let message = body
        .message
        .or(body.error)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "unexpected status".to_string());

    JikanError::status(status, message)
}
