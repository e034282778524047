pub mod client;
pub mod coalesce;
pub mod memory;
pub mod store;
pub mod valkey;

pub use client::{CacheClient, CacheError, CacheResult, DEFAULT_TTL, MAX_TTL};
pub use memory::MemoryCacheClient;
pub use store::CacheStore;
pub use valkey::ValkeyClient;

use std::time::Duration;

/// Whether the access layer caches at all, chosen once at construction.
#[derive(Clone, Debug, Default)]
pub enum CachePolicy {
    /// Every call goes to the origin; nothing is read from or written to a cache.
    #[default]
    Disabled,
    Enabled { store: CacheStore, ttl: Duration },
}

impl CachePolicy {
    pub fn enabled(store: CacheStore) -> Self {
        Self::Enabled {
            store,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(self, ttl: Duration) -> Self {
        match self {
            Self::Enabled { store, .. } => Self::Enabled { store, ttl },
            Self::Disabled => Self::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled { .. })
    }

    pub fn store(&self) -> Option<&CacheStore> {
        match self {
            Self::Enabled { store, .. } => Some(store),
            Self::Disabled => None,
        }
    }
}
