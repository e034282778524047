/*
 * Responsibility
 * - 環境変数からクライアント設定を読み込む (JIKAN_BASE_URL, rate limit, cache backend など)
 * - 設定値のバリデーション (不正・不足なら構築失敗)
 */
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use url::Url;

use crate::services::cache::{DEFAULT_TTL, MAX_TTL};
use crate::services::cache::store::DEFAULT_PREFIX;
use crate::services::rate_limit::RateLimitConfig;
use crate::services::transport::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    None,
    Memory,
    Redis { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub request_timeout: Duration,

    pub rate_limit: RateLimitConfig,

    pub cache_backend: CacheBackend,
    pub cache_ttl: Duration,
    pub cache_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: DEFAULT_TIMEOUT,
            rate_limit: RateLimitConfig::default(),
            cache_backend: CacheBackend::None,
            cache_ttl: DEFAULT_TTL,
            cache_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).unwrap_or_else(|_| unreachable!("constant url"))
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source (env, tests, a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = match lookup("JIKAN_BASE_URL") {
            Some(raw) => Url::parse(&raw).map_err(|_| ConfigError::Invalid("JIKAN_BASE_URL"))?,
            None => defaults.base_url,
        };

        let request_timeout = parse_or(
            &lookup,
            "JIKAN_REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        )
        .map(Duration::from_secs)?;

        let burst = parse_non_zero(&lookup, "JIKAN_RATE_LIMIT_BURST", defaults.rate_limit.burst)?;
        let per_minute = parse_non_zero(
            &lookup,
            "JIKAN_RATE_LIMIT_PER_MINUTE",
            defaults.rate_limit.per_minute,
        )?;

        let cache_ttl = parse_or(&lookup, "JIKAN_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())
            .map(Duration::from_secs)?;
        if cache_ttl.is_zero() || cache_ttl > MAX_TTL {
            return Err(ConfigError::Invalid("JIKAN_CACHE_TTL_SECS"));
        }

        let cache_prefix = lookup("JIKAN_CACHE_PREFIX")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.cache_prefix);

        let cache_backend = match lookup("JIKAN_CACHE_BACKEND")
            .unwrap_or_else(|| "none".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "none" | "off" | "" => CacheBackend::None,
            "memory" => CacheBackend::Memory,
            "redis" | "valkey" => {
                let url = lookup("REDIS_URL").ok_or(ConfigError::Missing("REDIS_URL"))?;
                CacheBackend::Redis { url }
            }
            _ => return Err(ConfigError::Invalid("JIKAN_CACHE_BACKEND")),
        };

        Ok(Self {
            base_url,
            request_timeout,
            rate_limit: RateLimitConfig::new(burst, per_minute),
            cache_backend,
            cache_ttl,
            cache_prefix,
        })
    }

    pub fn with_cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache_backend = backend;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn parse_non_zero<F>(
    lookup: &F,
    key: &'static str,
    default: NonZeroU32,
) -> Result<NonZeroU32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.base_url.as_str(), "https://api.jikan.moe/");
        assert_eq!(cfg.rate_limit, RateLimitConfig::default());
        assert_eq!(cfg.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(cfg.cache_backend, CacheBackend::None);
        assert_eq!(cfg.cache_prefix, "jikan");
    }

    #[test]
    fn overrides_are_read() {
        let cfg = config(&[
            ("JIKAN_RATE_LIMIT_BURST", "5"),
            ("JIKAN_RATE_LIMIT_PER_MINUTE", "120"),
            ("JIKAN_CACHE_TTL_SECS", "60"),
            ("JIKAN_CACHE_BACKEND", "memory"),
            ("JIKAN_CACHE_PREFIX", "myapp"),
        ])
        .unwrap();
        assert_eq!(cfg.rate_limit.burst.get(), 5);
        assert_eq!(cfg.rate_limit.per_minute.get(), 120);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.cache_backend, CacheBackend::Memory);
        assert_eq!(cfg.cache_prefix, "myapp");
    }

    #[test]
    fn zero_rate_is_invalid() {
        let err = config(&[("JIKAN_RATE_LIMIT_PER_MINUTE", "0")]).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("JIKAN_RATE_LIMIT_PER_MINUTE"));
    }

    #[test]
    fn cache_ttl_must_be_within_bounds() {
        for raw in ["0", "31536001", "18446744073709551615"] {
            let err = config(&[("JIKAN_CACHE_TTL_SECS", raw)]).unwrap_err();
            assert_eq!(err, ConfigError::Invalid("JIKAN_CACHE_TTL_SECS"), "ttl {raw}");
        }

        let cfg = config(&[("JIKAN_CACHE_TTL_SECS", "31536000")]).unwrap();
        assert_eq!(cfg.cache_ttl, MAX_TTL);
    }

    #[test]
    fn redis_backend_needs_url() {
        let err = config(&[("JIKAN_CACHE_BACKEND", "redis")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("REDIS_URL"));

        let cfg = config(&[
            ("JIKAN_CACHE_BACKEND", "redis"),
            ("REDIS_URL", "redis://localhost:6379"),
        ])
        .unwrap();
        assert_eq!(
            cfg.cache_backend,
            CacheBackend::Redis {
                url: "redis://localhost:6379".into()
            }
        );
    }

    #[test]
    fn unknown_backend_is_invalid() {
        let err = config(&[("JIKAN_CACHE_BACKEND", "couchbase")]).unwrap_err();
        assert_eq!(err, ConfigError::Invalid("JIKAN_CACHE_BACKEND"));
    }
}
