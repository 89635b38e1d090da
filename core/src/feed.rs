//! The persistence loop: generate, persist, pause, repeat.
//!
//! LIFECYCLE:
//!   1. start()   connect to the store (optionally with backoff retries)
//!                and ensure the schema exists. Failures here are fatal.
//!   2. run()     loop until the clock reports a stop or the record limit
//!                is reached. Each iteration is independent.
//!   3. shutdown() release the store connection exactly once.
//!
//! RULES:
//!   - One record per insert, one commit per record. No batching.
//!   - A failed insert is logged, rolled back by the store, and the record
//!     is discarded. It is never retried or re-queued.
//!   - The only suspension point is the clock's wait between records.

use crate::{
    clock::{FeedClock, Wait},
    config::{FeedConfig, StoreConfig},
    error::{FeedError, FeedResult},
    pacer::Pacer,
    record::TransactionRecord,
    rng::{FeedRng, RandomSource, RngBank, StreamSlot},
    store::{FeedStore, TransactionSink},
    synthesizer::Synthesizer,
    types::RecordId,
};

/// What happened to one generated record.
#[derive(Debug)]
pub enum StepOutcome {
    Persisted(RecordId),
    Discarded(FeedError),
}

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub generated: u64,
    pub persisted: u64,
    pub failed: u64,
}

pub struct TransactionFeed<S: TransactionSink, C: FeedClock, R: RandomSource = FeedRng> {
    sink: S,
    clock: C,
    synthesizer: Synthesizer<R>,
    pacer: Pacer,
    max_records: Option<u64>,
    summary: FeedSummary,
}

impl<C: FeedClock> TransactionFeed<FeedStore, C> {
    /// Connect, ensure the schema, and wire the synthesizer and pacer from
    /// `config`. The master seed is logged so the run can be replayed.
    pub fn start(config: &FeedConfig, mut clock: C) -> FeedResult<Self> {
        config.validate()?;
        let bank = match config.seed {
            Some(seed) => RngBank::new(seed),
            None => RngBank::from_entropy(),
        };
        log::info!("feed: master seed {}", bank.master_seed());

        let store = connect_with_retry(&config.store, &mut clock, &mut bank.stream(StreamSlot::Backoff))?;
        store.ensure_schema()?;

        let synthesizer = Synthesizer::new(config.vocabulary.clone(), bank.stream(StreamSlot::Synthesis));
        let pacer = Pacer::new(&config.pacing, bank.stream(StreamSlot::Pacing));
        Ok(Self::new(store, clock, synthesizer, pacer, config.pacing.max_records))
    }
}

impl<S: TransactionSink, C: FeedClock, R: RandomSource> TransactionFeed<S, C, R> {
    pub fn new(
        sink: S,
        clock: C,
        synthesizer: Synthesizer<R>,
        pacer: Pacer,
        max_records: Option<u64>,
    ) -> Self {
        Self {
            sink,
            clock,
            synthesizer,
            pacer,
            max_records,
            summary: FeedSummary::default(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Generate one record and try to persist it.
    pub fn step(&mut self) -> StepOutcome {
        let record = self.synthesizer.generate_at(self.clock.now());
        self.summary.generated += 1;
        match self.sink.insert(&record) {
            Ok(id) => {
                self.summary.persisted += 1;
                log_persisted(id, &record);
                StepOutcome::Persisted(id)
            }
            Err(e) => {
                self.summary.failed += 1;
                log::warn!(
                    "feed: record {} ({}) discarded: {e}",
                    record.rrn,
                    record.transaction_type
                );
                StepOutcome::Discarded(e)
            }
        }
    }

    /// Run until a stop is requested or the record limit is reached.
    pub fn run(&mut self) -> FeedSummary {
        log::info!("feed: started");
        loop {
            if self.clock.stop_requested() {
                log::info!("feed: stop requested");
                break;
            }
            self.step();
            if self.limit_reached() {
                log::info!("feed: record limit of {} reached", self.summary.generated);
                break;
            }
            let pause = self.pacer.next_interval();
            log::debug!("feed: next record in {:.1}s", pause.as_secs_f64());
            if self.clock.wait(pause) == Wait::Interrupted {
                log::info!("feed: interrupted while waiting");
                break;
            }
        }
        log::info!(
            "feed: stopped after {} records ({} persisted, {} failed)",
            self.summary.generated,
            self.summary.persisted,
            self.summary.failed
        );
        self.summary
    }

    /// Release the store connection. Consumes the feed so the connection
    /// cannot be released twice.
    pub fn shutdown(self) -> FeedResult<FeedSummary> {
        let summary = self.summary;
        self.sink.close()?;
        Ok(summary)
    }

    fn limit_reached(&self) -> bool {
        matches!(self.max_records, Some(limit) if self.summary.generated >= limit)
    }
}

fn log_persisted(id: RecordId, record: &TransactionRecord) {
    log::info!(
        "feed: record {id} persisted at {} rrn={} type={} amount={} {}",
        record.time.format("%H:%M:%S"),
        record.rrn,
        record.transaction_type,
        record.transaction_amount,
        record.currency
    );
    if record.is_declined() {
        log::debug!(
            "feed: record {id} declined card={} error_code={}",
            record.card_no,
            record.error_code
        );
    }
}

/// Connect, retrying with doubling backoff up to `connect_attempts` times.
/// Waits go through the clock, so a stop during backoff aborts startup.
pub fn connect_with_retry<C: FeedClock, R: RandomSource>(
    config: &StoreConfig,
    clock: &mut C,
    jitter: &mut R,
) -> FeedResult<FeedStore> {
    let mut backoff = config.retry_backoff()?;
    let mut attempt = 1;
    loop {
        match FeedStore::connect(config) {
            Ok(store) => return Ok(store),
            Err(e) if attempt < config.connect_attempts => {
                // Up to 10% jitter so restarted feeds do not retry in lockstep.
                let pause = backoff.saturating_add(backoff.mul_f64(jitter.next_f64() * 0.1));
                log::warn!(
                    "store: connect attempt {attempt}/{} failed: {e}; retrying in {:.1}s",
                    config.connect_attempts,
                    pause.as_secs_f64()
                );
                if clock.wait(pause) == Wait::Interrupted {
                    return Err(FeedError::Interrupted);
                }
                // Stays at the last value once doubling would overflow.
                if let Some(doubled) = backoff.checked_mul(2) {
                    backoff = doubled;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
