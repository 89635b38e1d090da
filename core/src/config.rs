//! Immutable feed configuration.
//!
//! Built once at startup (defaults, or a JSON file, then CLI overrides),
//! validated, and passed explicitly to the synthesizer, pacer and store.
//! Nothing reads configuration from globals.

use crate::{
    error::{FeedError, FeedResult},
    record::{Outcome, TransactionType, NO_CURRENCY},
    store::limits,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fixed vocabularies every record field is drawn from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub channels: Vec<String>,
    pub interfaces: Vec<String>,
    pub mti_types: Vec<String>,
    pub transaction_types: Vec<TransactionType>,
    pub currencies: Vec<String>,
    pub response_codes: Vec<String>,
    pub approval_codes: Vec<String>,
    pub products: Vec<String>,
    pub terminal_names: Vec<String>,
    pub originator_types: Vec<String>,
    pub terminal_countries: Vec<String>,
    pub terminal_locations: Vec<String>,
    pub pos_entry_modes: Vec<String>,
    pub decline_reasons: Vec<Outcome>,
    pub mcc_codes: Vec<String>,
    /// Real error codes only. "No error" is the empty string on the
    /// record and never appears here.
    pub error_codes: Vec<String>,
    pub rrn_prefix: String,
    pub card_leading_digits: Vec<char>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            channels: strings(&["TBLACQ9777", "HYP_RETAIL", "TBLACQ9900", "VISAACQ123"]),
            interfaces: strings(&["STIP"]),
            mti_types: strings(&["1614", "1110", "1210"]),
            transaction_types: TransactionType::ALL.to_vec(),
            currencies: strings(&["BDT", "USD", "EUR"]),
            response_codes: strings(&["600", "000"]),
            approval_codes: strings(&["918133", "201760", "375836", "169856", "354585", "112962"]),
            products: strings(&["VCTBL-VISA-ONUS", "MSTP-MASTERCARD", "AMEX-GOLD"]),
            terminal_names: strings(&[
                "DHANMONDI BRANCH ATM",
                "TBL TEST MERCHANT POS",
                "GULSHAN BRANCH ATM",
            ]),
            originator_types: strings(&["TBLACQ9777", "HYP_RETAIL"]),
            terminal_countries: strings(&["050"]),
            terminal_locations: strings(&["Dhaka BD", "Chittagong BD", "Khulna BD"]),
            pos_entry_modes: strings(&["511201513146600", "511201513146000", "510101513144000"]),
            decline_reasons: vec![
                Outcome::from_narrative("Accepted: Administrative info accepted"),
                Outcome::from_narrative("Approved"),
                Outcome::from_narrative("Decline: Withdrawal amount limit exceeded"),
            ],
            mcc_codes: strings(&["6011", "5311", "5812"]),
            error_codes: strings(&["SL_POS_CASH_DAILY", "SL_POS_CASH_WEEKLY"]),
            rrn_prefix: "51461".into(),
            card_leading_digits: vec!['4', '5'],
        }
    }
}

/// Length of the RRN prefix; the suffix is always seven digits.
pub const RRN_PREFIX_LEN: usize = 5;

impl Vocabulary {
    pub fn validate(&self) -> FeedResult<()> {
        let text_fields: [(&str, &[String], usize); 14] = [
            ("channels", &self.channels, limits::CHANNEL),
            ("interfaces", &self.interfaces, limits::INTERFACE),
            ("mti_types", &self.mti_types, limits::MTI),
            ("currencies", &self.currencies, limits::CURRENCY),
            ("response_codes", &self.response_codes, limits::RESPONSE_CODE),
            ("approval_codes", &self.approval_codes, limits::APPROVAL_CODE),
            ("products", &self.products, limits::PRODUCT),
            ("terminal_names", &self.terminal_names, limits::TERMINAL_NAME),
            ("originator_types", &self.originator_types, limits::ORIGINATOR_TYPE),
            ("terminal_countries", &self.terminal_countries, limits::TERMINAL_COUNTRY),
            ("terminal_locations", &self.terminal_locations, limits::TERMINAL_LOCATION),
            ("pos_entry_modes", &self.pos_entry_modes, limits::POS_ENTRY_MODE),
            ("mcc_codes", &self.mcc_codes, limits::MCC),
            ("error_codes", &self.error_codes, usize::MAX),
        ];
        for (name, values, max_len) in text_fields {
            require_non_empty(name, values.len())?;
            if let Some(v) = values.iter().find(|v| v.chars().count() > max_len) {
                return Err(FeedError::Config(format!(
                    "{name}: '{v}' is longer than {max_len} characters"
                )));
            }
        }
        let digit_fields: [(&str, &[String], Option<usize>); 6] = [
            ("mti_types", &self.mti_types, Some(4)),
            ("approval_codes", &self.approval_codes, Some(6)),
            ("response_codes", &self.response_codes, Some(3)),
            ("mcc_codes", &self.mcc_codes, Some(4)),
            ("terminal_countries", &self.terminal_countries, Some(3)),
            ("pos_entry_modes", &self.pos_entry_modes, None),
        ];
        for (name, values, width) in digit_fields {
            if let Some(v) = values.iter().find(|v| !is_digit_code(v, width)) {
                let shape = match width {
                    Some(n) => format!("exactly {n} digits"),
                    None => "digits only".to_string(),
                };
                return Err(FeedError::Config(format!("{name}: '{v}' must be {shape}")));
            }
        }
        require_non_empty("transaction_types", self.transaction_types.len())?;
        require_non_empty("decline_reasons", self.decline_reasons.len())?;
        require_non_empty("card_leading_digits", self.card_leading_digits.len())?;

        if let Some(o) = self
            .decline_reasons
            .iter()
            .find(|o| o.narrative.chars().count() > limits::DECLINE_REASON)
        {
            return Err(FeedError::Config(format!(
                "decline_reasons: '{}' is longer than {} characters",
                o.narrative,
                limits::DECLINE_REASON
            )));
        }
        if self.currencies.iter().any(|c| c == NO_CURRENCY) {
            return Err(FeedError::Config(format!(
                "currencies: '{NO_CURRENCY}' is reserved for balance inquiries"
            )));
        }
        if self.error_codes.iter().any(|e| e.is_empty()) {
            return Err(FeedError::Config(
                "error_codes: the empty 'no error' code must not be listed".into(),
            ));
        }
        if self.rrn_prefix.chars().count() != RRN_PREFIX_LEN {
            return Err(FeedError::Config(format!(
                "rrn_prefix: '{}' must be exactly {RRN_PREFIX_LEN} characters",
                self.rrn_prefix
            )));
        }
        if let Some(d) = self
            .card_leading_digits
            .iter()
            .find(|d| !d.is_ascii_digit() || **d == '0')
        {
            return Err(FeedError::Config(format!(
                "card_leading_digits: '{d}' is not a digit 1-9"
            )));
        }
        Ok(())
    }
}

fn is_digit_code(value: &str, width: Option<usize>) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && width.map_or(true, |n| value.len() == n)
}

/// Convert a configured number of seconds, rejecting values a `Duration`
/// cannot hold (negative, NaN, infinite, or too large).
fn seconds(name: &str, secs: f64) -> FeedResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| FeedError::Config(format!("{name}: {secs} is not a valid number of seconds ({e})")))
}

fn require_non_empty(name: &str, len: usize) -> FeedResult<()> {
    if len == 0 {
        return Err(FeedError::Config(format!("{name}: vocabulary must not be empty")));
    }
    Ok(())
}

/// Connection options, passed straight through to the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// File path, `:memory:`, or a `file:` URI.
    pub database: String,
    /// When false, a missing database file is a connection error.
    pub create_if_missing: bool,
    pub busy_timeout_ms: u64,
    /// Applied with `PRAGMA journal_mode`; ignored by in-memory stores.
    pub journal_mode: Option<String>,
    /// Total connection attempts at startup. 1 means no retry.
    pub connect_attempts: u32,
    /// First retry delay; doubles after each failed attempt.
    pub retry_backoff_secs: f64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: "transactions.db".into(),
            create_if_missing: true,
            busy_timeout_ms: 5_000,
            journal_mode: Some("WAL".into()),
            connect_attempts: 1,
            retry_backoff_secs: 1.0,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            database: ":memory:".into(),
            journal_mode: None,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> FeedResult<()> {
        if self.database.trim().is_empty() {
            return Err(FeedError::Config("store.database must not be empty".into()));
        }
        if self.connect_attempts == 0 {
            return Err(FeedError::Config("store.connect_attempts must be at least 1".into()));
        }
        self.retry_backoff()?;
        Ok(())
    }

    pub fn retry_backoff(&self) -> FeedResult<Duration> {
        seconds("store.retry_backoff_secs", self.retry_backoff_secs)
    }
}

/// Pause between records, drawn uniformly from [min, max] seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_interval_secs: f64,
    pub max_interval_secs: f64,
    /// Stop after this many generated records. None runs until interrupted.
    pub max_records: Option<u64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 5.0,
            max_interval_secs: 15.0,
            max_records: None,
        }
    }
}

impl PacingConfig {
    pub fn validate(&self) -> FeedResult<()> {
        let min = seconds("pacing.min_interval_secs", self.min_interval_secs)?;
        let max = seconds("pacing.max_interval_secs", self.max_interval_secs)?;
        if min > max {
            return Err(FeedError::Config(format!(
                "pacing: min_interval_secs {} exceeds max_interval_secs {}",
                self.min_interval_secs, self.max_interval_secs
            )));
        }
        if self.max_records == Some(0) {
            return Err(FeedError::Config("pacing.max_records must be at least 1".into()));
        }
        Ok(())
    }

    /// Lower pause bound. Values `validate` would reject collapse to zero.
    pub fn min_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.min_interval_secs).unwrap_or_default()
    }

    /// Upper pause bound, never below `min_interval`.
    pub fn max_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_interval_secs)
            .unwrap_or_default()
            .max(self.min_interval())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub vocabulary: Vocabulary,
    pub store: StoreConfig,
    pub pacing: PacingConfig,
    /// Master seed for every RNG stream. None draws one from OS entropy.
    pub seed: Option<u64>,
}

impl FeedConfig {
    /// Load from a JSON file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> FeedResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| FeedError::Io {
            path: path.to_string(),
            source,
        })?;
        let config: FeedConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults against an in-memory store with zero pacing, for tests.
    pub fn default_test() -> Self {
        Self {
            vocabulary: Vocabulary::default(),
            store: StoreConfig::in_memory(),
            pacing: PacingConfig {
                min_interval_secs: 0.0,
                max_interval_secs: 0.0,
                max_records: None,
            },
            seed: Some(42),
        }
    }

    pub fn validate(&self) -> FeedResult<()> {
        self.vocabulary.validate()?;
        self.store.validate()?;
        self.pacing.validate()?;
        Ok(())
    }
}
