use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use thiserror::Error;

use super::parser::{parse_feed, FetchedItem};
use crate::config::FeedSource;

/// Some servers (reddit among them) refuse requests without a browser-like
/// user-agent, so every fetch sends one explicitly.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/74.0.3729.169 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors for a single feed fetch. Always scoped to one source — a failure
/// here never aborts the rest of the batch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A successfully parsed feed: the title the feed reports about itself,
/// plus its raw items.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub title: String,
    pub items: Vec<FetchedItem>,
}

/// Outcome of fetching one configured source.
#[derive(Debug)]
pub struct SourceFetch {
    pub source: FeedSource,
    pub result: Result<FetchedFeed, FetchError>,
}

/// Capability the engine needs from the network layer.
///
/// The production implementation is [`HttpTransport`]; tests substitute a
/// fake that returns canned feeds.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Fetch every source concurrently. One outcome per source, in input
    /// order; failures are carried per-source, never propagated.
    async fn fetch_all(&self, sources: &[FeedSource]) -> Vec<SourceFetch>;
}

/// HTTP fetcher over a shared reqwest client.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    async fn fetch_one(&self, source: &FeedSource) -> Result<FetchedFeed, FetchError> {
        let response = tokio::time::timeout(FETCH_TIMEOUT, self.client.get(&source.url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = response.bytes().await.map_err(FetchError::Network)?;
        parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn fetch_all(&self, sources: &[FeedSource]) -> Vec<SourceFetch> {
        // Fan out across all sources at once; the batch is bounded only by
        // the number of configured sources.
        let fetches = sources.iter().map(|source| async move {
            let result = self.fetch_one(source).await;
            SourceFetch {
                source: source.clone(),
                result,
            }
        });

        join_all(fetches).await
    }
}
