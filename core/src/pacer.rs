//! Inter-record pause selection.

use crate::{
    config::PacingConfig,
    rng::{FeedRng, RandomSource},
};
use std::time::Duration;

/// Draws the pause before the next record, uniform over [min, max].
pub struct Pacer<R: RandomSource = FeedRng> {
    min: Duration,
    max: Duration,
    rng: R,
}

impl<R: RandomSource> Pacer<R> {
    pub fn new(config: &PacingConfig, rng: R) -> Self {
        Self {
            min: config.min_interval(),
            max: config.max_interval(),
            rng,
        }
    }

    pub fn next_interval(&mut self) -> Duration {
        let span = self.max.saturating_sub(self.min);
        self.min + span.mul_f64(self.rng.next_f64())
    }
}
