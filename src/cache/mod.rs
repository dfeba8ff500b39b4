//! Cache module for persisting the feed to disk
//!
//! This module provides the durable [`FeedStore`] contract, its file-backed
//! implementation and the [`FeedCache`] that serves stored feeds while they
//! are fresh and refreshes them from the remote source once they expire.

mod feed_cache;
mod local;
mod store;

pub use feed_cache::{Clock, FeedCache};
pub use local::{LocalFeedStore, DEFAULT_STORE_FILE};
pub use store::{CachedPayload, FeedStore, StoreError, StoreState};
