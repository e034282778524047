//! Process-wide outbound rate limiter (token bucket).
//!
//! One `RateLimiter` is built at client construction and shared by `Arc`
//! with every endpoint. Jikan allows 3 requests per second and 60 per minute,
//! which is the default quota.
use std::{fmt, num::NonZeroU32};

use governor::{
    Quota, RateLimiter as Governor,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use thiserror::Error;

use crate::context::{Context, Interrupted};

type DirectRateLimiter = Governor<NotKeyed, InMemoryState, DefaultClock>;

pub const DEFAULT_BURST: NonZeroU32 = NonZeroU32::new(3).unwrap();
pub const DEFAULT_PER_MINUTE: NonZeroU32 = NonZeroU32::new(60).unwrap();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Bucket capacity.
    pub burst: NonZeroU32,
    /// Steady-state refill rate.
    pub per_minute: NonZeroU32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: DEFAULT_BURST,
            per_minute: DEFAULT_PER_MINUTE,
        }
    }
}

impl RateLimitConfig {
    pub fn new(burst: NonZeroU32, per_minute: NonZeroU32) -> Self {
        Self { burst, per_minute }
    }

    fn quota(&self) -> Quota {
        Quota::per_minute(self.per_minute).allow_burst(self.burst)
    }
}

/// The caller gave up while waiting for a token. No token was consumed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("rate limit wait aborted: {0}")]
pub struct RateLimitError(#[from] pub Interrupted);

pub struct RateLimiter {
    limiter: DirectRateLimiter,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiter: Governor::direct(config.quota()),
            config,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Waits for a token, or until `ctx` is cancelled / past its deadline.
    ///
    /// Tokens are only taken on success: a waiter that is interrupted leaves
    /// the bucket exactly as it found it.
    pub async fn acquire(&self, ctx: &Context) -> Result<(), RateLimitError> {
        ctx.run(self.limiter.until_ready()).await?;
        Ok(())
    }

    /// Takes a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
