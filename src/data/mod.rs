//! Core data models for the Rijksmuseum feed
//!
//! This module contains the feed item types shared by the remote source, the
//! durable store and the cache, plus the single-operation [`FeedLoader`]
//! contract every feed reader implements.

pub mod remote;

pub use remote::{encode_envelope, FetchError, RemoteFeedLoader};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Reference to an image hosted by the collection API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    /// Stable identifier of the image
    pub guid: String,
    /// Absolute URL of the image
    pub url: String,
}

/// A single object in the collection feed
///
/// Items compare by value. `id` identifies an object within a feed, but the
/// feed may contain duplicates and they are passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub object_number: String,
    pub title: String,
    pub long_title: String,
    /// Main artwork image
    #[serde(rename = "webImage")]
    pub primary_image: ImageRef,
    /// Wide banner crop of the artwork
    pub header_image: ImageRef,
}

impl FeedItem {
    /// Returns the image reference selected by `header`
    pub fn image(&self, header: bool) -> &ImageRef {
        if header {
            &self.header_image
        } else {
            &self.primary_image
        }
    }
}

/// Loads the feed from somewhere
///
/// Implemented by the remote source, by the TTL cache wrapping it and by any
/// other decorator that re-exposes the same contract.
pub trait FeedLoader: Send + Sync {
    /// Loads the full list of feed items
    fn load(&self) -> BoxFuture<'_, Result<Vec<FeedItem>, FetchError>>;
}

impl<T: FeedLoader + ?Sized> FeedLoader for std::sync::Arc<T> {
    fn load(&self) -> BoxFuture<'_, Result<Vec<FeedItem>, FetchError>> {
        (**self).load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_item;

    #[test]
    fn test_feed_item_serializes_with_wire_field_names() {
        let item = sample_item("1");
        let json = serde_json::to_value(&item).expect("Failed to serialize FeedItem");

        assert_eq!(json["id"], "1");
        assert_eq!(json["objectNumber"], "SK-C-1");
        assert_eq!(json["longTitle"], "Long title 1");
        assert_eq!(json["webImage"]["guid"], "web-1");
        assert_eq!(json["headerImage"]["url"], "https://images.example/1-header.jpg");
        assert!(json.get("primaryImage").is_none());
    }

    #[test]
    fn test_feed_item_keeps_long_title_distinct_from_title() {
        let json = r#"{
            "id": "en-SK-A-4050",
            "objectNumber": "SK-A-4050",
            "title": "Self-portrait",
            "longTitle": "Self-portrait, Rembrandt van Rijn, 1669",
            "webImage": {"guid": "g1", "url": "https://lh3.example/a"},
            "headerImage": {"guid": "g2", "url": "https://lh3.example/b"}
        }"#;

        let item: FeedItem = serde_json::from_str(json).expect("Failed to deserialize FeedItem");

        assert_eq!(item.title, "Self-portrait");
        assert_eq!(item.long_title, "Self-portrait, Rembrandt van Rijn, 1669");
    }

    #[test]
    fn test_feed_items_compare_by_value() {
        assert_eq!(sample_item("a"), sample_item("a"));

        let mut changed = sample_item("a");
        changed.header_image.url.push_str("?v=2");
        assert_ne!(sample_item("a"), changed);
    }

    #[test]
    fn test_image_selects_header_or_primary() {
        let item = sample_item("7");
        assert_eq!(item.image(false).guid, "web-7");
        assert_eq!(item.image(true).guid, "header-7");
    }
}
