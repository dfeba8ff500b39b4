//! Artwork image fetching
//!
//! [`ImageLoader`] downloads image bytes through a size-bounded in-memory
//! response cache. [`ImageMapper`] turns raw bytes into a [`DecodedImage`];
//! the bundled [`SniffingImageMapper`] only identifies the format.

use std::collections::{HashMap, VecDeque};

use bytes::Bytes;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Default byte budget of the response cache (50 MiB)
pub const DEFAULT_CACHE_CAPACITY: usize = 50 * 1024 * 1024;

/// Errors that can occur when loading or mapping an image
#[derive(Debug, Error)]
pub enum ImageError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    /// The bytes are not a recognised image
    #[error("Data is not a recognised image")]
    InvalidData,
}

/// Image encodings recognised by their file signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl ImageFormat {
    /// Identifies the format from the leading bytes
    pub fn sniff(data: &[u8]) -> Option<Self> {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

        if data.starts_with(PNG) {
            Some(ImageFormat::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            Some(ImageFormat::WebP)
        } else {
            None
        }
    }

    /// Conventional file extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
        }
    }
}

/// Image bytes with their identified format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub bytes: Bytes,
}

/// Maps raw bytes to an image
pub trait ImageMapper: Send + Sync {
    fn map(&self, data: Bytes) -> BoxFuture<'_, Result<DecodedImage, ImageError>>;
}

/// Mapper that accepts any data with a known image signature
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingImageMapper;

impl ImageMapper for SniffingImageMapper {
    fn map(&self, data: Bytes) -> BoxFuture<'_, Result<DecodedImage, ImageError>> {
        Box::pin(async move {
            let format = ImageFormat::sniff(&data).ok_or(ImageError::InvalidData)?;
            Ok(DecodedImage {
                format,
                bytes: data,
            })
        })
    }
}

/// Cached responses, evicted oldest first once the byte budget is spent
#[derive(Debug, Default)]
struct ResponseCache {
    entries: HashMap<String, Bytes>,
    order: VecDeque<String>,
    used: usize,
}

impl ResponseCache {
    fn insert(&mut self, url: &str, bytes: Bytes, capacity: usize) {
        if bytes.len() > capacity || self.entries.contains_key(url) {
            return;
        }
        while self.used + bytes.len() > capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.used -= evicted.len();
                debug!(url = %oldest, "Evicted cached image");
            }
        }
        self.used += bytes.len();
        self.order.push_back(url.to_string());
        self.entries.insert(url.to_string(), bytes);
    }
}

/// Downloads images, keeping successful responses in memory
#[derive(Debug)]
pub struct ImageLoader {
    client: Client,
    capacity: usize,
    cache: RwLock<ResponseCache>,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ImageLoader {
    /// Creates a loader whose cache holds at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self::with_client(Client::new(), capacity)
    }

    pub fn with_client(client: Client, capacity: usize) -> Self {
        Self {
            client,
            capacity,
            cache: RwLock::new(ResponseCache::default()),
        }
    }

    /// Returns the image at `url`, from the cache when present
    ///
    /// Only 2xx responses carrying a recognised image are returned and cached.
    /// Older entries are evicted to make room; a response larger than the
    /// whole budget is returned uncached.
    pub async fn load(&self, url: &str) -> Result<Bytes, ImageError> {
        if let Some(bytes) = self.cached(url) {
            debug!(url, "Image cache hit");
            return Ok(bytes);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        if ImageFormat::sniff(&bytes).is_none() {
            return Err(ImageError::InvalidData);
        }

        self.remember(url, bytes.clone());
        Ok(bytes)
    }

    fn cached(&self, url: &str) -> Option<Bytes> {
        self.cache.read().entries.get(url).cloned()
    }

    fn remember(&self, url: &str, bytes: Bytes) {
        self.cache.write().insert(url, bytes, self.capacity);
    }
}
