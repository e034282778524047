//! `JikanClient`: the entry point applications hold on to.
//!
//! All endpoint groups of one client share the same rate limiter and cache
//! policy. To share one limiter between several clients, build it once and
//! pass it to each builder with [`JikanClientBuilder::rate_limiter`].
use std::{sync::Arc, time::Duration};

use tracing::info;
use url::Url;

use crate::api::{AnimeEndpoints, SeasonsEndpoints, TopEndpoints};
use crate::config::{CacheBackend, ClientConfig, ConfigError};
use crate::error::{JikanError, Result};
use crate::keys::CacheKey;
use crate::services::cache::{
    CacheClient, CacheError, CachePolicy, CacheStore, DEFAULT_TTL, MAX_TTL, MemoryCacheClient,
    ValkeyClient,
};
use crate::services::rate_limit::{RateLimitConfig, RateLimiter};
use crate::services::read_through::ReadThrough;
use crate::services::transport::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpTransport, Transport};

#[derive(Clone, Debug)]
pub struct JikanClient {
    read: ReadThrough,
}

impl JikanClient {
    /// Default client: public API, default quota, no cache.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> JikanClientBuilder {
        JikanClientBuilder::default()
    }

    /// Builds a client from configuration, connecting the cache backend it names.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let builder = Self::builder()
            .base_url(config.base_url.clone())
            .timeout(config.request_timeout)
            .rate_limit(config.rate_limit)
            .cache_ttl(config.cache_ttl)
            .cache_prefix(config.cache_prefix.clone());

        let builder = match &config.cache_backend {
            CacheBackend::None => builder,
            CacheBackend::Memory => builder.cache(Arc::new(MemoryCacheClient::new())),
            CacheBackend::Redis { url } => {
                let client = ValkeyClient::new(url)
                    .await
                    .map_err(JikanError::CacheSetup)?;
                builder.cache(Arc::new(client))
            }
        };

        builder.build()
    }

    pub fn anime(&self) -> AnimeEndpoints<'_> {
        AnimeEndpoints::new(&self.read)
    }

    pub fn seasons(&self) -> SeasonsEndpoints<'_> {
        SeasonsEndpoints::new(&self.read)
    }

    pub fn top(&self) -> TopEndpoints<'_> {
        TopEndpoints::new(&self.read)
    }

    pub fn cache_policy(&self) -> &CachePolicy {
        self.read.cache()
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        self.read.limiter()
    }

    /// Removes one cached entry (no-op without a cache).
    pub async fn invalidate(&self, key: &CacheKey) -> std::result::Result<(), CacheError> {
        self.read.invalidate(key).await
    }
}

pub struct JikanClientBuilder {
    base_url: Option<Url>,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    rate_limit: RateLimitConfig,
    limiter: Option<Arc<RateLimiter>>,
    cache: Option<Arc<dyn CacheClient>>,
    cache_prefix: Option<String>,
    cache_ttl: Duration,
}

impl Default for JikanClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            rate_limit: RateLimitConfig::default(),
            limiter: None,
            cache: None,
            cache_prefix: None,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

impl JikanClientBuilder {
    pub fn base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the HTTP transport (base URL and timeout are then ignored).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Uses an existing limiter instead of building one from `rate_limit`.
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Enables caching on the given backend.
    pub fn cache(mut self, client: Arc<dyn CacheClient>) -> Self {
        self.cache = Some(client);
        self
    }

    pub fn cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = Some(prefix.into());
        self
    }

    /// Must be non-zero and at most [`MAX_TTL`]; `build` rejects anything else.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn build(self) -> Result<JikanClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => {
                let base_url = match self.base_url {
                    Some(url) => url,
                    None => Url::parse(DEFAULT_BASE_URL)
                        .map_err(|_| ConfigError::Invalid("base_url"))?,
                };
                Arc::new(HttpTransport::new(base_url, self.timeout)?)
            }
        };

        let limiter = self
            .limiter
            .unwrap_or_else(|| Arc::new(RateLimiter::new(self.rate_limit)));

        let cache = match self.cache {
            Some(client) => {
                if self.cache_ttl.is_zero() || self.cache_ttl > MAX_TTL {
                    return Err(ConfigError::Invalid("cache_ttl").into());
                }
                let store = match self.cache_prefix {
                    Some(prefix) => CacheStore::new_with_prefix(client, prefix),
                    None => CacheStore::new(client),
                };
                info!(
                    backend = store.backend_name(),
                    prefix = store.prefix(),
                    ttl_secs = self.cache_ttl.as_secs(),
                    "response cache enabled"
                );
                CachePolicy::enabled(store).with_ttl(self.cache_ttl)
            }
            None => CachePolicy::Disabled,
        };

        Ok(JikanClient {
            read: ReadThrough::new(transport, limiter, cache),
        })
    }
}
