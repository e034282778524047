use crate::{
    context::Context,
    error::Result,
    keys::{CacheKey, ResourceKind},
    models::{Anime, AnimeFull},
    services::read_through::{FetchResult, ReadThrough},
};

#[derive(Clone, Copy, Debug)]
pub struct AnimeEndpoints<'a> {
    read: &'a ReadThrough,
}

impl<'a> AnimeEndpoints<'a> {
    pub(crate) fn new(read: &'a ReadThrough) -> Self {
        Self { read }
    }

    /// Returns an anime resource.
    ///
    /// https://docs.api.jikan.moe/#/anime/getanimebyid
    pub async fn get_by_id(self, ctx: &Context, id: u32) -> Result<FetchResult<Anime>> {
        let key = CacheKey::entity(ResourceKind::Anime, id);
        self.read
            .fetch_one(ctx, &key, &format!("/v4/anime/{id}"))
            .await
    }

    /// Returns a complete anime resource (relations, themes, links).
    ///
    /// https://docs.api.jikan.moe/#/anime/getanimefullbyid
    pub async fn get_full_by_id(self, ctx: &Context, id: u32) -> Result<FetchResult<AnimeFull>> {
        let key = CacheKey::entity(ResourceKind::AnimeFull, id);
        self.read
            .fetch_one(ctx, &key, &format!("/v4/anime/{id}/full"))
            .await
    }
}
