//! Command-line interface parsing for rijksfeed
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the [`FeedConfig`] used to wire the store, remote source and cache.

use std::path::PathBuf;

use chrono::Duration;
use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::LocalFeedStore;

/// Collection query used when no endpoint is configured
pub const DEFAULT_ENDPOINT: &str =
    "https://www.rijksmuseum.nl/api/en/collection?key=9b2htUjo&involvedMaker=Rembrandt+van+Rijn";

/// Seconds a cached feed stays fresh when no max age is configured
pub const DEFAULT_MAX_AGE_SECS: u64 = 5 * 60;

/// Error types for CLI configuration
#[derive(Debug, Error)]
pub enum CliError {
    /// No store path given and no cache directory could be determined
    #[error("Cannot determine a cache directory; pass --store <PATH>")]
    NoCacheDirectory,

    /// The max age does not fit in a duration
    #[error("Max age out of range: {0} seconds")]
    MaxAgeOutOfRange(u64),

    /// No feed item has the requested id
    #[error("No item with id '{0}' in the feed")]
    UnknownItem(String),
}

/// rijksfeed - Browse the Rijksmuseum collection through a local cache
#[derive(Parser, Debug)]
#[command(name = "rijksfeed")]
#[command(about = "Rijksmuseum collection feed with a TTL disk cache")]
#[command(version)]
pub struct Cli {
    /// Collection endpoint returning the feed envelope
    #[arg(long, env = "RIJKSFEED_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    pub endpoint: String,

    /// Store file for the cached feed (defaults to the user cache directory)
    #[arg(long, env = "RIJKSFEED_STORE", value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,

    /// Seconds a cached feed is served before refreshing
    #[arg(long, env = "RIJKSFEED_MAX_AGE", value_name = "SECS", default_value_t = DEFAULT_MAX_AGE_SECS, global = true)]
    pub max_age: u64,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every item in the feed (default)
    List,

    /// Show the details of one item
    Show {
        /// Item id
        id: String,
    },

    /// Download the image of one item
    Image {
        /// Item id
        id: String,
        /// Download the header image instead of the main image
        #[arg(long)]
        header: bool,
        /// Output file
        #[arg(short, long, value_name = "PATH")]
        out: PathBuf,
    },

    /// Delete the cached feed
    Clear,
}

/// Wiring configuration derived from CLI arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub endpoint: String,
    pub store_path: PathBuf,
    pub max_age: Duration,
    pub command: Command,
    pub verbose: bool,
}

impl FeedConfig {
    /// Creates a FeedConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(FeedConfig)` with defaults filled in
    /// * `Err(CliError)` if no store path can be determined or the max age is too large
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let store_path = match &cli.store {
            Some(path) => path.clone(),
            None => LocalFeedStore::default_path().ok_or(CliError::NoCacheDirectory)?,
        };

        let max_age = i64::try_from(cli.max_age)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or(CliError::MaxAgeOutOfRange(cli.max_age))?;

        Ok(FeedConfig {
            endpoint: cli.endpoint.clone(),
            store_path,
            max_age,
            command: cli.command.clone().unwrap_or(Command::List),
            verbose: cli.verbose,
        })
    }
}
