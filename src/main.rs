//! rijksfeed - Browse the Rijksmuseum collection from the terminal
//!
//! Wires the file-backed store, the remote collection source and the TTL
//! cache together, and delivers every result on the main thread.

use std::error::Error;

use chrono::Utc;
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rijksfeed::cache::{FeedCache, FeedStore, LocalFeedStore};
use rijksfeed::cli::{Cli, CliError, Command, FeedConfig};
use rijksfeed::data::{FeedItem, FeedLoader, RemoteFeedLoader};
use rijksfeed::dispatch::{MainLoop, MainQueue, MainThreadDecorator};
use rijksfeed::image::{ImageLoader, SniffingImageMapper};

/// Sets up logging to stderr; `RUST_LOG` overrides the default filter
fn init_logging(verbose: bool) {
    let filter = if verbose {
        "rijksfeed=debug,info"
    } else {
        "rijksfeed=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Drives the main loop until `completion` is delivered
///
/// Returns `None` if the completion can no longer arrive.
async fn deliver<R>(main_loop: &mut MainLoop, mut completion: oneshot::Receiver<R>) -> Option<R> {
    loop {
        tokio::select! {
            result = &mut completion => return result.ok(),
            more = main_loop.run_next() => {
                if !more {
                    return completion.try_recv().ok();
                }
            }
        }
    }
}

async fn load_feed<T: FeedLoader + 'static>(
    feed: &MainThreadDecorator<T>,
    main_loop: &mut MainLoop,
) -> Result<Vec<FeedItem>, Box<dyn Error>> {
    let (tx, rx) = oneshot::channel();
    feed.load(move |result| {
        let _ = tx.send(result);
    });

    let result = deliver(main_loop, rx)
        .await
        .ok_or("Feed load was abandoned")?;
    Ok(result?)
}

fn find_item<'a>(items: &'a [FeedItem], id: &str) -> Result<&'a FeedItem, CliError> {
    items
        .iter()
        .find(|item| item.id == id)
        .ok_or_else(|| CliError::UnknownItem(id.to_string()))
}

fn print_list(items: &[FeedItem]) {
    if items.is_empty() {
        println!("The feed is empty.");
        return;
    }
    for item in items {
        println!("{:<24} {:<14} {}", item.id, item.object_number, item.title);
    }
}

fn print_item(item: &FeedItem) {
    println!("Id:            {}", item.id);
    println!("Object number: {}", item.object_number);
    println!("Title:         {}", item.title);
    println!("Long title:    {}", item.long_title);
    println!("Image:         {}", item.primary_image.url);
    println!("Header image:  {}", item.header_image.url);
}

async fn save_image(
    item: &FeedItem,
    header: bool,
    out: &std::path::Path,
    queue: &MainQueue,
    main_loop: &mut MainLoop,
) -> Result<(), Box<dyn Error>> {
    let url = &item.image(header).url;
    let data = ImageLoader::default().load(url).await?;

    let mapper = MainThreadDecorator::new(SniffingImageMapper, queue.clone());
    let (tx, rx) = oneshot::channel();
    mapper.map(data, move |result| {
        let _ = tx.send(result);
    });
    let image = deliver(main_loop, rx)
        .await
        .ok_or("Image mapping was abandoned")??;

    tokio::fs::write(out, &image.bytes).await?;
    println!(
        "Saved {} image ({} bytes) to {}",
        image.format.extension(),
        image.bytes.len(),
        out.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = FeedConfig::from_cli(&cli)?;
    init_logging(config.verbose);

    let store = LocalFeedStore::new(&config.store_path);
    if config.command == Command::Clear {
        store.delete().await?;
        info!(path = %config.store_path.display(), "Cleared cached feed");
        println!("Cleared cached feed at {}", config.store_path.display());
        return Ok(());
    }

    let (queue, mut main_loop) = MainQueue::for_current_thread();
    let cache = FeedCache::new(
        store,
        RemoteFeedLoader::new(config.endpoint.as_str()),
        config.max_age,
        Utc::now,
    );
    debug!(
        endpoint = %config.endpoint,
        max_age_secs = cache.max_age().num_seconds(),
        "Feed cache ready"
    );
    let feed = MainThreadDecorator::new(cache, queue.clone());
    let items = load_feed(&feed, &mut main_loop).await?;

    match &config.command {
        Command::List | Command::Clear => print_list(&items),
        Command::Show { id } => print_item(find_item(&items, id)?),
        Command::Image { id, header, out } => {
            let item = find_item(&items, id)?;
            save_image(item, *header, out, &queue, &mut main_loop).await?;
        }
    }

    Ok(())
}
