//! feed-runner: continuously writes synthetic card transactions to SQLite.
//!
//! Usage:
//!   feed-runner
//!   feed-runner --db feed.db --seed 12345 --min-interval 1 --max-interval 3
//!   feed-runner --config feed.json --count 100
//!
//! Stops on Ctrl+C. Exit code 0 on a clean stop, non-zero when startup
//! (configuration, connection, schema) fails.

use anyhow::{Context, Result};
use feed_core::{
    clock::{stop_channel, FeedClock, WallClock},
    config::FeedConfig,
    feed::TransactionFeed,
    store::FeedStore,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = build_config(&args)?;

    println!("Card transaction feed");
    println!("  db:        {}", config.store.database);
    println!(
        "  interval:  {}-{}s",
        config.pacing.min_interval_secs, config.pacing.max_interval_secs
    );
    match config.pacing.max_records {
        Some(n) => println!("  records:   {n}"),
        None => println!("  records:   until Ctrl+C"),
    }
    println!();

    let (stop_handle, stop_signal) = stop_channel();
    let signal_handle = stop_handle.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!("\nStopping transaction feed...");
                signal_handle.stop();
            }
            Err(e) => log::error!("cannot listen for Ctrl+C: {e}"),
        }
    });

    let Some(mut feed) = start_feed(&config, WallClock::new(stop_signal))? else {
        println!("Stopped before the store was ready.");
        return Ok(());
    };
    println!("Transaction feed started. Press Ctrl+C to stop...");

    // The loop blocks on inserts and waits, so it runs off the async workers.
    // Dropping the feed on a panic still releases the connection.
    let summary = tokio::task::spawn_blocking(move || {
        feed.run();
        feed.shutdown()
    })
    .await
    .context("feed worker panicked")??;
    drop(stop_handle);

    println!("Database connection closed.");
    println!(
        "  generated: {}  persisted: {}  failed: {}",
        summary.generated, summary.persisted, summary.failed
    );
    Ok(())
}

/// Start the feed. A stop requested during startup yields `None`; any
/// other startup failure is an error.
fn start_feed<C: FeedClock>(
    config: &FeedConfig,
    clock: C,
) -> Result<Option<TransactionFeed<FeedStore, C>>> {
    match TransactionFeed::start(config, clock) {
        Ok(feed) => Ok(Some(feed)),
        Err(e) if !e.is_fatal() => {
            log::info!("feed: {e}");
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to start transaction feed"),
    }
}

fn build_config(args: &[String]) -> Result<FeedConfig> {
    let mut config = match find_arg(args, "--config") {
        Some(path) => FeedConfig::load(path)?,
        None => FeedConfig::default(),
    };
    if let Some(db) = find_arg(args, "--db") {
        config.store.database = db.to_string();
    }
    if let Some(seed) = parse_arg::<u64>(args, "--seed")? {
        config.seed = Some(seed);
    }
    if let Some(min) = parse_arg::<f64>(args, "--min-interval")? {
        config.pacing.min_interval_secs = min;
    }
    if let Some(max) = parse_arg::<f64>(args, "--max-interval")? {
        config.pacing.max_interval_secs = max;
    }
    if let Some(count) = parse_arg::<u64>(args, "--count")? {
        config.pacing.max_records = Some(count);
    }
    config.validate()?;
    Ok(config)
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    find_arg(args, flag)
        .map(|v| v.parse::<T>().with_context(|| format!("invalid value for {flag}: {v}")))
        .transpose()
}
