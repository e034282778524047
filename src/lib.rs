//! Rate-limited, cache-aside client for the Jikan (unofficial MyAnimeList) API.
//!
//! ```ignore
//! let client = JikanClient::builder()
//!     .cache(Arc::new(ValkeyClient::new("redis://localhost:6379").await?))
//!     .build()?;
//!
//! let ctx = Context::with_timeout(Duration::from_secs(10));
//! let anime = client.anime().get_by_id(&ctx, 1).await?;
//! println!("{} (cached: {})", anime.data.title, anime.is_cached());
//! ```
pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod keys;
pub mod models;
pub mod services;

pub use client::{JikanClient, JikanClientBuilder};
pub use config::{CacheBackend, ClientConfig, ConfigError};
pub use context::{Context, Interrupted};
pub use error::{JikanError, Result};
pub use keys::{CacheKey, Keyed, QueryParams, ResourceKind};
pub use services::read_through::{FetchResult, Origin};
