//! Endpoint groups. Each one only builds a cache key and a request path and
//! hands both to the read-through layer.
pub mod anime;
pub mod seasons;
pub mod top;

pub use anime::AnimeEndpoints;
pub use seasons::SeasonsEndpoints;
pub use top::TopEndpoints;

use crate::keys::QueryParams;

// `path?query`, or just `path` when there is nothing to filter on.
fn with_query(path: &str, query: &QueryParams) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.encode())
    }
}
