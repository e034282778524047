use super::with_query;
use crate::{
    context::Context,
    error::Result,
    keys::{CacheKey, QueryParams, ResourceKind},
    models::{Anime, Page},
    services::read_through::{FetchResult, ReadThrough},
};

#[derive(Clone, Copy, Debug)]
pub struct SeasonsEndpoints<'a> {
    read: &'a ReadThrough,
}

impl<'a> SeasonsEndpoints<'a> {
    pub(crate) fn new(read: &'a ReadThrough) -> Self {
        Self { read }
    }

    /// Anime airing in the current season. Accepted query parameters
    /// (`filter`, `sfw`, `page`, `limit`, ...) are listed in the API docs.
    ///
    /// https://docs.api.jikan.moe/#/seasons/getseasonnow
    pub async fn now(self, ctx: &Context, query: &QueryParams) -> Result<FetchResult<Page<Anime>>> {
        let key = CacheKey::collection(ResourceKind::SeasonsNow, query);
        self.read
            .fetch_page(ctx, &key, &with_query("/v4/seasons/now", query))
            .await
    }
}
