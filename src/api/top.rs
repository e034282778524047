use super::with_query;
use crate::{
    context::Context,
    error::Result,
    keys::{CacheKey, QueryParams, ResourceKind},
    models::{Anime, Page},
    services::read_through::{FetchResult, ReadThrough},
};

#[derive(Clone, Copy, Debug)]
pub struct TopEndpoints<'a> {
    read: &'a ReadThrough,
}

impl<'a> TopEndpoints<'a> {
    pub(crate) fn new(read: &'a ReadThrough) -> Self {
        Self { read }
    }

    /// Top anime. Filter with query parameters (`type`, `filter`, `rating`,
    /// `page`, `limit`).
    ///
    /// https://docs.api.jikan.moe/#/top/gettopanime
    pub async fn anime(self, ctx: &Context, query: &QueryParams) -> Result<FetchResult<Page<Anime>>> {
        let key = CacheKey::collection(ResourceKind::TopAnime, query);
        self.read
            .fetch_page(ctx, &key, &with_query("/v4/top/anime", query))
            .await
    }
}
