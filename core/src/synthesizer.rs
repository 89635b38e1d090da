//! Record synthesis: one self-consistent transaction per call.
//!
//! Draw order is fixed so a given seed always yields the same record
//! sequence:
//!   1. timestamp
//!   2. transaction type
//!   3. amount and currency (conditional on type)
//!   4. decline reason, then error code (conditional on outcome)
//!   5. independent vocabulary fields
//!   6. RRN suffix and masked card number
//!
//! Cross-field rules:
//!   - BALINQ and PIN-CHANGE move no money: amount 0.
//!   - BALINQ reports currency "NON"; every other type draws a currency.
//!   - Billing amount and currency mirror the transaction's.
//!   - An error code is present exactly when the outcome is a decline.

use crate::{
    card::MaskedPan,
    config::Vocabulary,
    record::{TransactionRecord, TransactionType, NO_CURRENCY},
    rng::{FeedRng, RandomSource},
    types::Amount,
};
use chrono::{Local, NaiveDateTime};

/// Amounts are whole multiples of this many units.
pub const AMOUNT_STEP_UNITS: u64 = 100;
/// Multiplier range for the step, inclusive: amounts span [100, 100000].
pub const AMOUNT_MULTIPLIER_MIN: u64 = 1;
pub const AMOUNT_MULTIPLIER_MAX: u64 = 1_000;

const RRN_SUFFIX_MIN: u64 = 1_000_000;
const RRN_SUFFIX_MAX: u64 = 9_999_999;

pub struct Synthesizer<R: RandomSource = FeedRng> {
    vocab: Vocabulary,
    rng: R,
}

impl<R: RandomSource> Synthesizer<R> {
    /// `vocab` must already be validated; generation assumes every
    /// vocabulary is non-empty.
    pub fn new(vocab: Vocabulary, rng: R) -> Self {
        Self { vocab, rng }
    }

    /// Generate a record stamped with the local wall-clock time.
    pub fn generate(&mut self) -> TransactionRecord {
        self.generate_at(Local::now().naive_local())
    }

    /// Generate a record stamped with `time`.
    pub fn generate_at(&mut self, time: NaiveDateTime) -> TransactionRecord {
        let vocab = &self.vocab;
        let rng = &mut self.rng;

        let transaction_type = *rng.pick(&vocab.transaction_types);
        let transaction_amount = if transaction_type.moves_money() {
            let multiplier = rng.next_in_range(AMOUNT_MULTIPLIER_MIN, AMOUNT_MULTIPLIER_MAX);
            Amount::from_units(multiplier * AMOUNT_STEP_UNITS)
        } else {
            Amount::ZERO
        };
        let currency = if transaction_type == TransactionType::BalanceInquiry {
            NO_CURRENCY.to_string()
        } else {
            rng.pick(&vocab.currencies).clone()
        };

        let outcome = rng.pick(&vocab.decline_reasons);
        let error_code = if outcome.is_decline() {
            rng.pick(&vocab.error_codes).clone()
        } else {
            String::new()
        };

        let channel = rng.pick(&vocab.channels).clone();
        let interface = rng.pick(&vocab.interfaces).clone();
        let mti = rng.pick(&vocab.mti_types).clone();
        let approval_code = rng.pick(&vocab.approval_codes).clone();
        let response_code = rng.pick(&vocab.response_codes).clone();
        let product = rng.pick(&vocab.products).clone();
        let terminal_name = rng.pick(&vocab.terminal_names).clone();
        let originator_type = rng.pick(&vocab.originator_types).clone();
        let terminal_country = rng.pick(&vocab.terminal_countries).clone();
        let terminal_location = rng.pick(&vocab.terminal_locations).clone();
        let pos_entry_mode = rng.pick(&vocab.pos_entry_modes).clone();
        let mcc = rng.pick(&vocab.mcc_codes).clone();

        let rrn = format!(
            "{}{}",
            vocab.rrn_prefix,
            rng.next_in_range(RRN_SUFFIX_MIN, RRN_SUFFIX_MAX)
        );
        let card_no = MaskedPan::synthesize(rng, &vocab.card_leading_digits);

        TransactionRecord {
            time,
            channel,
            interface,
            mti,
            card_no,
            transaction_type,
            transaction_amount,
            billing_amount: transaction_amount,
            billing_currency: currency.clone(),
            currency,
            approval_code,
            response_code,
            rrn,
            product,
            terminal_name,
            originator_type,
            terminal_country,
            terminal_location,
            pos_entry_mode,
            decline_reason: outcome.narrative.clone(),
            mcc,
            error_code,
            status: outcome.status,
        }
    }
}
