//! Durable store contract for the cached feed

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::FeedItem;

/// Errors that can occur when reading or writing the persisted feed
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading, writing or renaming the store file failed
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The payload could not be serialized
    #[error("Failed to encode cached feed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The store holds non-empty content that is not a valid payload
    #[error("Failed to decode cached feed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The store worker stopped before answering
    #[error("Store is closed")]
    Closed,
}

/// Feed items together with the instant they were fetched from the remote source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPayload {
    pub items: Vec<FeedItem>,
    /// When the items were fetched, never when they were read back
    pub timestamp: DateTime<Utc>,
}

impl CachedPayload {
    pub fn new(items: Vec<FeedItem>, timestamp: DateTime<Utc>) -> Self {
        Self { items, timestamp }
    }
}

/// Content of the store as seen by a successful load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing was ever written, or the content was deleted
    Empty,
    /// A previously saved payload
    Present(CachedPayload),
}

/// Persists a single [`CachedPayload`]
///
/// Every call enqueues its operation before returning, so operations apply in
/// the order they were issued even if their futures are polled in a different
/// order. Loads may run concurrently with each other; `save` and `delete` wait
/// for everything issued before them and block everything issued after them.
pub trait FeedStore: Send + Sync {
    /// Reads the persisted payload
    fn load(&self) -> BoxFuture<'_, Result<StoreState, StoreError>>;

    /// Replaces the persisted content with `payload`
    fn save(&self, payload: CachedPayload) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Clears the persisted content so the next load yields [`StoreState::Empty`]
    fn delete(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}

impl<T: FeedStore + ?Sized> FeedStore for std::sync::Arc<T> {
    fn load(&self) -> BoxFuture<'_, Result<StoreState, StoreError>> {
        (**self).load()
    }

    fn save(&self, payload: CachedPayload) -> BoxFuture<'_, Result<(), StoreError>> {
        (**self).save(payload)
    }

    fn delete(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        (**self).delete()
    }
}
