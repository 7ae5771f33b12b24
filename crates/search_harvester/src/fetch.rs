use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Url;

use crate::query::SearchQuery;
use crate::{ApiResponse, TransportError, TransportFailure};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
            user_agent: concat!("search_harvester/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// GET against a search endpoint. Any completed exchange is `Ok`, whatever its
/// status; only transport-level faults are errors.
#[async_trait::async_trait]
pub trait SearchClient: Send + Sync {
    async fn get(&self, query: &SearchQuery) -> Result<ApiResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSearchClient {
    base_url: Url,
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestSearchClient {
    pub fn new(base_url: &str, settings: FetchSettings) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|err| TransportError::new(TransportFailure::InvalidUrl, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| TransportError::new(TransportFailure::Network, err.to_string()))?;
        Ok(Self {
            base_url,
            client,
            settings,
        })
    }

    /// The query string is encoded by [`SearchQuery`] and attached verbatim,
    /// replacing any query already present on the base url.
    pub fn request_url(&self, query: &SearchQuery) -> Url {
        let mut url = self.base_url.clone();
        let encoded = query.to_query_string();
        if encoded.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&encoded));
        }
        url
    }

    fn too_large(&self, actual: u64) -> TransportError {
        TransportError::new(
            TransportFailure::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl SearchClient for ReqwestSearchClient {
    async fn get(&self, query: &SearchQuery) -> Result<ApiResponse, TransportError> {
        let response = self
            .client
            .get(self.request_url(query))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(ApiResponse { status, body })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    // Strip the url; it carries the api key.
    let err = err.without_url();
    if err.is_timeout() {
        return TransportError::new(TransportFailure::Timeout, err.to_string());
    }
    TransportError::new(TransportFailure::Network, err.to_string())
}
