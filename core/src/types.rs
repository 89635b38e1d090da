//! Shared primitive types used across the feed.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row id handed back by the store for a committed record.
pub type RecordId = i64;

/// A non-negative money amount in minor units (two fractional digits).
///
/// Stored as an integer count of cents, so a fractional cent cannot be
/// represented at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Amount of `units` whole currency units.
    pub fn from_units(units: u64) -> Self {
        Self(units * 100)
    }

    pub fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

// DECIMAL(18,2) columns have NUMERIC affinity in SQLite. Binding as REAL keeps
// every cent exact for amounts well inside f64's 53-bit mantissa.
impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.cents() as f64 / 100.0))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let cents = match value {
            ValueRef::Integer(i) => i.checked_mul(100),
            ValueRef::Real(r) => Some((r * 100.0).round() as i64),
            _ => return Err(rusqlite::types::FromSqlError::InvalidType),
        };
        match cents {
            Some(c) if c >= 0 => Ok(Amount::from_cents(c as u64)),
            Some(c) => Err(rusqlite::types::FromSqlError::OutOfRange(c)),
            None => Err(rusqlite::types::FromSqlError::InvalidType),
        }
    }
}
