//! Origin transport: single GET request/response against the Jikan API.
//!
//! The trait is the seam the read-through layer talks to; `HttpTransport` is
//! the reqwest implementation. Rate limiting and cancellation are applied by
//! the caller around `get`, dropping the future aborts the request.
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header::HeaderMap};
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.jikan.moe";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status/metadata envelope of an origin response.
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OriginResponse {
    pub meta: ResponseMeta,
    pub body: Bytes,
}

impl OriginResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            meta: ResponseMeta::new(status),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid request path {path:?}: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("origin request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("origin request failed: {0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Issues `GET {base}{path_and_query}` and returns status, headers and body.
    async fn get(&self, path_and_query: &str) -> Result<OriginResponse, TransportError>;
}

/// reqwest-backed transport.
///
/// Jikan only supports GET requests:
/// https://docs.api.jikan.moe/#/section/information/allowed-http(s)-requests
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jikan-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url_for(&self, path_and_query: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path_and_query)
            .map_err(|source| TransportError::InvalidPath {
                path: path_and_query.to_string(),
                source,
            })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path_and_query: &str) -> Result<OriginResponse, TransportError> {
        let url = self.url_for(path_and_query)?;

        let resp = self.client.get(url).send().await?;
        let meta = ResponseMeta {
            status: resp.status(),
            headers: resp.headers().clone(),
        };
        let body = resp.bytes().await?;

        Ok(OriginResponse { meta, body })
    }
}
