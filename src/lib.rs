//! rijksfeed library
//!
//! Exposes the feed model, the remote source, the TTL disk cache, the
//! main-thread dispatch decorator and the CLI configuration for use by the
//! binary and the integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod dispatch;
pub mod image;

#[cfg(test)]
pub(crate) mod test_support;
