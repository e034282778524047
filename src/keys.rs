//! Cache key construction.
//!
//! Keys are namespaced by shape (`entity` vs `collection`) and by resource kind,
//! so an entity lookup can never collide with a collection lookup. Collection
//! keys embed the query parameters in sorted, url-encoded form: two parameter
//! sets that differ only in insertion order produce the same key.
use std::{collections::BTreeMap, fmt};

use url::form_urlencoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Anime,
    AnimeFull,
    SeasonsNow,
    TopAnime,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Anime => "anime",
            ResourceKind::AnimeFull => "anime-full",
            ResourceKind::SeasonsNow => "seasons-now",
            ResourceKind::TopAnime => "top-anime",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters of a collection request.
///
/// Backed by a `BTreeMap`, so iteration (and therefore encoding) is always in
/// key order. Setting a key twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.0.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` form, keys sorted.
    pub fn encode(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.0 {
            ser.append_pair(k, v);
        }
        ser.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut q = QueryParams::new();
        for (k, v) in iter {
            q.set(k, v);
        }
        q
    }
}

/// Opaque cache key. The store prefix is applied later by the cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn entity(kind: ResourceKind, id: impl fmt::Display) -> Self {
        Self(format!("entity:{}:{}", kind, id))
    }

    pub fn collection(kind: ResourceKind, query: &QueryParams) -> Self {
        Self(format!("collection:{}:{}", kind, query.encode()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A value that knows the entity key it is cached under. Used to index the
/// items of a collection response individually.
pub trait Keyed {
    fn cache_key(&self) -> CacheKey;
}
