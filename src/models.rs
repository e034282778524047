//! Deserialization targets for Jikan v4 responses.
//!
//! Jikan sends `null` for many fields (unscored shows, unknown air dates), so
//! optional data is `Option` and every struct falls back to defaults for
//! missing fields.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::keys::{CacheKey, Keyed, ResourceKind};

/// `{ "data": T }` envelope of single-resource endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody<T> {
    pub data: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationItems {
    pub count: u32,
    pub total: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub last_visible_page: u32,
    pub has_next_page: bool,
    pub current_page: u32,
    pub items: PaginationItems,
}

/// Paginated list response. Cached as a whole under its collection key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl<T> Page<T> {
    pub fn has_next_page(&self) -> bool {
        self.pagination.as_ref().is_some_and(|p| p.has_next_page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    pub image_url: Option<String>,
    pub small_image_url: Option<String>,
    pub large_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trailer {
    pub youtube_id: Option<String>,
    pub url: Option<String>,
    pub embed_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Title {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiredInfo {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastInfo {
    pub day: Option<String>,
    pub time: Option<String>,
    pub timezone: Option<String>,
}

/// Reference to another MyAnimeList resource (studio, genre, producer, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entity {
    pub mal_id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relation {
    pub relation: String,
    pub entry: Vec<Entity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub openings: Vec<String>,
    pub endings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Anime {
    pub mal_id: u32,
    pub url: String,
    pub images: HashMap<String, Image>,
    pub trailer: Trailer,
    pub approved: bool,
    pub titles: Vec<Title>,
    pub title: String,
    pub title_english: Option<String>,
    pub title_japanese: Option<String>,
    pub title_synonyms: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub source: Option<String>,
    pub episodes: Option<u32>,
    pub status: Option<String>,
    pub airing: bool,
    pub aired: AiredInfo,
    pub duration: Option<String>,
    pub rating: Option<String>,
    pub score: Option<f64>,
    pub scored_by: Option<u64>,
    pub rank: Option<u32>,
    pub popularity: Option<u32>,
    pub members: Option<u64>,
    pub favorites: Option<u64>,
    pub synopsis: Option<String>,
    pub background: Option<String>,
    pub season: Option<String>,
    pub year: Option<u32>,
    pub broadcast: BroadcastInfo,
    pub producers: Vec<Entity>,
    pub licensors: Vec<Entity>,
    pub studios: Vec<Entity>,
    pub genres: Vec<Entity>,
    pub explicit_genres: Vec<Entity>,
    pub themes: Vec<Entity>,
    pub demographics: Vec<Entity>,
}

impl Anime {
    /// Rx (and R+/R-17+) ratings are considered explicit.
    pub fn is_explicit(&self) -> bool {
        self.rating.as_deref().is_some_and(|r| r.starts_with('R'))
    }
}

impl Keyed for Anime {
    fn cache_key(&self) -> CacheKey {
        CacheKey::entity(ResourceKind::Anime, self.mal_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimeFull {
    #[serde(flatten)]
    pub anime: Anime,
    pub relations: Vec<Relation>,
    pub theme: Theme,
    pub external: Vec<Link>,
    pub streaming: Vec<Link>,
}

impl Keyed for AnimeFull {
    fn cache_key(&self) -> CacheKey {
        CacheKey::entity(ResourceKind::AnimeFull, self.anime.mal_id)
    }
}

/// Body of a non-2xx Jikan response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiErrorBody {
    pub status: Option<u16>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}
