/*
 * Responsibility
 * - クライアント共通の JikanError 定義
 * - origin 側の失敗 (transport / status / decode / cancel) だけを呼び出し側に返す
 * - cache 側の失敗はここに現れない (read path で origin fetch に縮退する)
 */
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;
use crate::context::Interrupted;
use crate::services::cache::CacheError;
use crate::services::rate_limit::RateLimitError;
use crate::services::transport::TransportError;

pub type Result<T> = std::result::Result<T, JikanError>;

#[derive(Debug, Error)]
pub enum JikanError {
    /// The caller's context was cancelled or timed out outside the rate limiter.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
    /// The caller gave up while waiting for a rate-limit token.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Origin answered with a non-success status. Never cached.
    #[error("origin returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to decode origin response: {0}")]
    Decode(#[from] serde_json::Error),

    // Construction-time only; a fetch never returns these.
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cache setup failed: {0}")]
    CacheSetup(CacheError),
}

impl JikanError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// `true` when the call stopped because of the caller's own context.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Interrupted(_) | Self::RateLimit(_))
    }
}
