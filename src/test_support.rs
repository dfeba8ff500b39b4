//! Test doubles shared by the unit tests
//!
//! The spies forward every call to a channel together with a responder, so a
//! test decides when and how each operation completes.

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};

use crate::cache::{CachedPayload, FeedStore, StoreError, StoreState};
use crate::data::{FeedItem, FeedLoader, FetchError, ImageRef};

pub(crate) fn sample_item(id: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        object_number: format!("SK-C-{}", id),
        title: format!("Title {}", id),
        long_title: format!("Long title {}", id),
        primary_image: ImageRef {
            guid: format!("web-{}", id),
            url: format!("https://images.example/{}.jpg", id),
        },
        header_image: ImageRef {
            guid: format!("header-{}", id),
            url: format!("https://images.example/{}-header.jpg", id),
        },
    }
}

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub(crate) fn any_store_error() -> StoreError {
    StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, "any store error"))
}

pub(crate) fn any_fetch_error() -> FetchError {
    FetchError::Status(503)
}

pub(crate) type Responder<T> = oneshot::Sender<Result<T, StoreError>>;

#[derive(Debug)]
pub(crate) enum StoreMessage {
    Load(Responder<StoreState>),
    Save(CachedPayload, Responder<()>),
    Delete(Responder<()>),
}

/// Store whose operations complete only when the test answers them
pub(crate) struct StoreSpy {
    messages: mpsc::UnboundedSender<StoreMessage>,
}

impl StoreSpy {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<StoreMessage>) {
        let (messages, received) = mpsc::unbounded_channel();
        (Self { messages }, received)
    }

    fn forward<T: Send + 'static>(
        &self,
        message: StoreMessage,
        response: oneshot::Receiver<Result<T, StoreError>>,
    ) -> BoxFuture<'_, Result<T, StoreError>> {
        let _ = self.messages.send(message);
        Box::pin(async move { response.await.unwrap_or(Err(StoreError::Closed)) })
    }
}

impl FeedStore for StoreSpy {
    fn load(&self) -> BoxFuture<'_, Result<StoreState, StoreError>> {
        let (reply, response) = oneshot::channel();
        self.forward(StoreMessage::Load(reply), response)
    }

    fn save(&self, payload: CachedPayload) -> BoxFuture<'_, Result<(), StoreError>> {
        let (reply, response) = oneshot::channel();
        self.forward(StoreMessage::Save(payload, reply), response)
    }

    fn delete(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        let (reply, response) = oneshot::channel();
        self.forward(StoreMessage::Delete(reply), response)
    }
}

pub(crate) type LoadRequest = oneshot::Sender<Result<Vec<FeedItem>, FetchError>>;

/// Feed loader whose loads complete only when the test answers them
pub(crate) struct LoaderSpy {
    requests: mpsc::UnboundedSender<LoadRequest>,
}

impl LoaderSpy {
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<LoadRequest>) {
        let (requests, received) = mpsc::unbounded_channel();
        (Self { requests }, received)
    }
}

impl FeedLoader for LoaderSpy {
    fn load(&self) -> BoxFuture<'_, Result<Vec<FeedItem>, FetchError>> {
        let (reply, response) = oneshot::channel();
        let _ = self.requests.send(reply);
        Box::pin(async move {
            // A dropped responder never completes, like a request that never returns
            match response.await {
                Ok(result) => result,
                Err(_) => futures::future::pending().await,
            }
        })
    }
}

/// Loader that immediately returns a fixed result
pub(crate) struct StubLoader {
    items: Vec<FeedItem>,
}

impl StubLoader {
    pub(crate) fn new(items: Vec<FeedItem>) -> Self {
        Self { items }
    }
}

impl FeedLoader for StubLoader {
    fn load(&self) -> BoxFuture<'_, Result<Vec<FeedItem>, FetchError>> {
        let items = self.items.clone();
        Box::pin(async move { Ok(items) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_spy_delete_completes_with_the_given_answer() {
        let (store, mut messages) = StoreSpy::new();

        for answer in [Ok(()), Err(any_store_error())] {
            let expect_ok = answer.is_ok();
            let delete = store.delete();
            match messages.recv().await {
                Some(StoreMessage::Delete(reply)) => {
                    let _ = reply.send(answer);
                }
                other => panic!("Expected a delete, got {:?}", other),
            }

            assert_eq!(delete.await.is_ok(), expect_ok);
        }
    }

    #[tokio::test]
    async fn test_store_spy_reports_closed_when_answer_is_dropped() {
        let (store, mut messages) = StoreSpy::new();

        let delete = store.delete();
        drop(messages.recv().await);

        assert!(matches!(delete.await, Err(StoreError::Closed)));
    }
}
