//! Synthetic card-transaction feed.
//!
//! A Synthesizer draws self-consistent transaction records from fixed
//! vocabularies; a TransactionFeed persists them one at a time into SQLite
//! at randomized intervals until it is told to stop.

pub mod card;
pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod pacer;
pub mod record;
pub mod rng;
pub mod store;
pub mod synthesizer;
pub mod types;
