//! Rijksmuseum collection API client
//!
//! Fetches the collection feed over HTTP and decodes the `{count, items}`
//! envelope into [`FeedItem`]s. Status, transport and decode failures are
//! reported as distinct [`FetchError`] variants. No retry happens here.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::{FeedItem, FeedLoader};

/// Errors that can occur when fetching the feed
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// The response body is not a valid feed envelope
    #[error("Failed to decode feed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Wire envelope returned by the collection endpoint
#[derive(Debug, Serialize, Deserialize)]
struct RemoteFeed {
    count: i64,
    /// The live API names this field `artObjects`
    #[serde(alias = "artObjects")]
    items: Vec<FeedItem>,
}

/// Encodes items in the wire envelope served by the collection endpoint
pub fn encode_envelope(items: &[FeedItem]) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    struct Envelope<'a> {
        count: usize,
        items: &'a [FeedItem],
    }

    serde_json::to_string(&Envelope {
        count: items.len(),
        items,
    })
}

/// Client for fetching the feed from a fixed collection endpoint
#[derive(Debug, Clone)]
pub struct RemoteFeedLoader {
    client: Client,
    url: String,
}

impl RemoteFeedLoader {
    /// Creates a loader for `url` with a default HTTP client
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    /// Creates a loader with a custom HTTP client
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn fetch(&self) -> Result<Vec<FeedItem>, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "Feed request rejected");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let feed: RemoteFeed = serde_json::from_slice(&body)?;
        debug!(count = feed.count, received = feed.items.len(), "Fetched remote feed");

        Ok(feed.items)
    }
}

impl FeedLoader for RemoteFeedLoader {
    fn load(&self) -> BoxFuture<'_, Result<Vec<FeedItem>, FetchError>> {
        Box::pin(self.fetch())
    }
}
