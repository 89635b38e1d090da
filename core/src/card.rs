//! Synthetic card numbers, masked at birth.
//!
//! The full PAN only ever lives on the stack of `MaskedPan::synthesize`.
//! Nothing outside this module can observe it.

use crate::rng::RandomSource;
use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Serialize, Serializer};
use std::fmt;

pub const MASK: &str = "******";
pub const VISIBLE_PREFIX: usize = 6;
pub const VISIBLE_SUFFIX: usize = 4;

/// Digits after the leading one: a number in [10^11, 10^12).
const BODY_MIN: u64 = 100_000_000_000;
const BODY_MAX: u64 = 999_999_999_999;

/// A card number reduced to `first6 + "******" + last4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedPan(String);

impl MaskedPan {
    /// Draw a 13-digit PAN starting with one of `leading_digits` and return
    /// only its masked form.
    pub fn synthesize<R: RandomSource>(rng: &mut R, leading_digits: &[char]) -> Self {
        let lead = *rng.pick(leading_digits);
        let body = rng.next_in_range(BODY_MIN, BODY_MAX);
        let pan = format!("{lead}{body:012}");
        Self::mask(&pan)
    }

    fn mask(pan: &str) -> Self {
        let head = &pan[..VISIBLE_PREFIX];
        let tail = &pan[pan.len() - VISIBLE_SUFFIX..];
        Self(format!("{head}{MASK}{tail}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn first_six(&self) -> &str {
        &self.0[..VISIBLE_PREFIX]
    }

    pub fn last_four(&self) -> &str {
        &self.0[self.0.len() - VISIBLE_SUFFIX..]
    }
}

impl fmt::Display for MaskedPan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for MaskedPan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl ToSql for MaskedPan {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}
