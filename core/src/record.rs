//! The transaction record and the closed enums it is built from.

use crate::{card::MaskedPan, types::Amount};
use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency reported for a balance inquiry, which moves no money.
pub const NO_CURRENCY: &str = "NON";

/// Narrative marker that classifies a decline reason as a decline.
pub const DECLINE_MARKER: &str = "Decline";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "PIN-CHANGE")]
    PinChange,
    #[serde(rename = "BALINQ")]
    BalanceInquiry,
    #[serde(rename = "CASH")]
    Cash,
    #[serde(rename = "PURCHASE")]
    Purchase,
}

impl TransactionType {
    pub const ALL: [TransactionType; 4] = [
        TransactionType::PinChange,
        TransactionType::BalanceInquiry,
        TransactionType::Cash,
        TransactionType::Purchase,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::PinChange => "PIN-CHANGE",
            Self::BalanceInquiry => "BALINQ",
            Self::Cash => "CASH",
            Self::Purchase => "PURCHASE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// PIN changes and balance inquiries carry no amount.
    pub fn moves_money(&self) -> bool {
        !matches!(self, Self::PinChange | Self::BalanceInquiry)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_str()?;
        Self::from_code(code)
            .ok_or_else(|| FromSqlError::Other(format!("unknown transaction type '{code}'").into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Accepted,
    Declined,
}

/// A decline-reason narrative with its status classified up front.
///
/// Generation branches on `status`; the narrative is display text only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Outcome {
    pub narrative: String,
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn from_narrative(narrative: impl Into<String>) -> Self {
        let narrative = narrative.into();
        let status = if narrative.contains(DECLINE_MARKER) {
            OutcomeStatus::Declined
        } else {
            OutcomeStatus::Accepted
        };
        Self { narrative, status }
    }

    pub fn is_decline(&self) -> bool {
        self.status == OutcomeStatus::Declined
    }
}

impl From<String> for Outcome {
    fn from(narrative: String) -> Self {
        Self::from_narrative(narrative)
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        outcome.narrative
    }
}

/// One synthesized card transaction. Built whole, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub time: NaiveDateTime,
    pub channel: String,
    pub interface: String,
    pub mti: String,
    pub card_no: MaskedPan,
    pub transaction_type: TransactionType,
    pub transaction_amount: Amount,
    pub currency: String,
    pub approval_code: String,
    pub response_code: String,
    pub rrn: String,
    pub product: String,
    pub terminal_name: String,
    pub originator_type: String,
    pub terminal_country: String,
    pub terminal_location: String,
    pub billing_amount: Amount,
    pub billing_currency: String,
    pub pos_entry_mode: String,
    pub decline_reason: String,
    pub mcc: String,
    /// Audit-only: carried on the record and logged, never persisted.
    pub error_code: String,
    /// Audit-only classification of `decline_reason`.
    pub status: OutcomeStatus,
}

impl TransactionRecord {
    pub fn is_declined(&self) -> bool {
        self.status == OutcomeStatus::Declined
    }
}
