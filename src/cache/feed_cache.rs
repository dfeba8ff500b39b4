//! TTL read-through cache for the feed
//!
//! [`FeedCache`] wraps a [`FeedStore`] and a [`FeedLoader`] and re-exposes the
//! loader contract. A read serves the stored payload while it is at most
//! `max_age` old and otherwise refreshes from the loader, writing the fresh
//! items back to the store.
//!
//! Store failures are never surfaced: an unreadable store counts as a miss
//! and a failed write-back is only logged. A read fails only when there is no
//! servable payload and the loader fails too.

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::store::{CachedPayload, FeedStore, StoreState};
use crate::data::{FeedItem, FeedLoader, FetchError};

/// Source of the current wall-clock instant
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct FeedCache<S, L> {
    store: S,
    loader: L,
    max_age: Duration,
    current_time: Clock,
}

impl<S: FeedStore, L: FeedLoader> FeedCache<S, L> {
    /// Creates a cache over `store` and `loader`
    ///
    /// # Arguments
    /// * `max_age` - Oldest payload age still served from the store (inclusive)
    /// * `current_time` - Clock used both for the age check and for write-back timestamps
    pub fn new<C>(store: S, loader: L, max_age: Duration, current_time: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            store,
            loader,
            max_age,
            current_time: Box::new(current_time),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the feed, from the store if fresh, otherwise from the loader
    ///
    /// # Returns
    /// * `Ok(items)` - Fresh cached items, or freshly fetched items
    /// * `Err(FetchError)` - No fresh cache and the loader failed
    pub async fn read(&self) -> Result<Vec<FeedItem>, FetchError> {
        match self.store.load().await {
            Ok(StoreState::Present(payload)) => {
                if self.is_fresh(&payload) {
                    debug!(items = payload.items.len(), "Serving feed from cache");
                    return Ok(payload.items);
                }
                debug!(cached_at = %payload.timestamp, "Cached feed expired");
            }
            Ok(StoreState::Empty) => debug!("Feed cache empty"),
            Err(e) => debug!(error = %e, "Feed cache unreadable, treating as miss"),
        }

        self.refresh().await
    }

    /// Age is measured against the clock at check time; exactly `max_age` is still fresh
    fn is_fresh(&self, payload: &CachedPayload) -> bool {
        (self.current_time)() - payload.timestamp <= self.max_age
    }

    async fn refresh(&self) -> Result<Vec<FeedItem>, FetchError> {
        let items = self.loader.load().await?;

        let payload = CachedPayload::new(items.clone(), (self.current_time)());
        match self.store.save(payload).await {
            Ok(()) => debug!(items = items.len(), "Cached refreshed feed"),
            Err(e) => warn!(error = %e, "Failed to cache refreshed feed"),
        }

        Ok(items)
    }
}

impl<S: FeedStore, L: FeedLoader> FeedLoader for FeedCache<S, L> {
    fn load(&self) -> BoxFuture<'_, Result<Vec<FeedItem>, FetchError>> {
        Box::pin(self.read())
    }
}
