//! Record synthesis invariants.
//!
//! Every property here must hold for every generated record, so each test
//! sweeps a large seeded sample rather than spot-checking one record.

use feed_core::{
    config::Vocabulary,
    record::{Outcome, TransactionRecord, TransactionType, DECLINE_MARKER, NO_CURRENCY},
    rng::{FeedRng, RngBank, StreamSlot},
    synthesizer::Synthesizer,
};

fn synthesizer(seed: u64, vocab: Vocabulary) -> Synthesizer<FeedRng> {
    Synthesizer::new(vocab, RngBank::new(seed).stream(StreamSlot::Synthesis))
}

fn sample(seed: u64, n: usize) -> Vec<TransactionRecord> {
    let mut synth = synthesizer(seed, Vocabulary::default());
    (0..n).map(|_| synth.generate()).collect()
}

#[test]
fn amount_follows_transaction_type() {
    for r in sample(1, 10_000) {
        match r.transaction_type {
            TransactionType::BalanceInquiry | TransactionType::PinChange => {
                assert!(r.transaction_amount.is_zero(), "{r:?}");
            }
            TransactionType::Cash | TransactionType::Purchase => {
                let units = r.transaction_amount.cents() / 100;
                assert!(units > 0, "{r:?}");
                assert_eq!(units % 100, 0, "{r:?}");
                assert!((100..=100_000).contains(&units), "{r:?}");
                assert_eq!(r.transaction_amount.cents() % 100, 0, "no fractional units: {r:?}");
            }
        }
    }
}

#[test]
fn billing_mirrors_transaction() {
    for r in sample(2, 10_000) {
        assert_eq!(r.billing_amount, r.transaction_amount);
        assert_eq!(r.billing_currency, r.currency);
    }
}

#[test]
fn balance_inquiries_report_no_currency() {
    let records = sample(3, 10_000);
    let inquiries: Vec<_> = records
        .iter()
        .filter(|r| r.transaction_type == TransactionType::BalanceInquiry)
        .collect();
    assert!(!inquiries.is_empty());
    for r in inquiries {
        assert_eq!(r.currency, NO_CURRENCY);
    }
    for r in records
        .iter()
        .filter(|r| r.transaction_type != TransactionType::BalanceInquiry)
    {
        assert_ne!(r.currency, NO_CURRENCY, "{r:?}");
    }
}

#[test]
fn error_code_present_exactly_when_declined() {
    let records = sample(4, 10_000);
    let mut declines = 0;
    for r in &records {
        let declined = r.decline_reason.contains(DECLINE_MARKER);
        assert_eq!(!r.error_code.is_empty(), declined, "{r:?}");
        assert_eq!(r.is_declined(), declined, "{r:?}");
        if declined {
            declines += 1;
            assert!(Vocabulary::default().error_codes.contains(&r.error_code));
        }
    }
    assert!(declines > 0 && declines < records.len());
}

#[test]
fn no_zero_amount_cash_in_a_thousand_records() {
    let zero_cash = sample(5, 1_000)
        .into_iter()
        .filter(|r| r.transaction_type == TransactionType::Cash && r.transaction_amount.is_zero())
        .count();
    assert_eq!(zero_cash, 0);
}

#[test]
fn forced_pin_change_has_zero_amount_and_real_currency() {
    let vocab = Vocabulary {
        transaction_types: vec![TransactionType::PinChange],
        ..Vocabulary::default()
    };
    let currencies = vocab.currencies.clone();
    let mut synth = synthesizer(6, vocab);
    for _ in 0..500 {
        let r = synth.generate();
        assert_eq!(r.transaction_type, TransactionType::PinChange);
        assert!(r.transaction_amount.is_zero());
        assert!(currencies.contains(&r.currency), "{}", r.currency);
        assert_ne!(r.currency, NO_CURRENCY);
    }
}

#[test]
fn approved_outcome_never_carries_an_error_code() {
    let vocab = Vocabulary {
        decline_reasons: vec![Outcome::from_narrative("Approved")],
        ..Vocabulary::default()
    };
    let mut synth = synthesizer(7, vocab);
    for _ in 0..500 {
        let r = synth.generate();
        assert_eq!(r.decline_reason, "Approved");
        assert_eq!(r.error_code, "");
    }

    // Same property inside the full default vocabulary.
    let approved: Vec<_> = sample(7, 2_000)
        .into_iter()
        .filter(|r| r.decline_reason == "Approved")
        .collect();
    assert!(!approved.is_empty());
    assert!(approved.iter().all(|r| r.error_code.is_empty()));
}

#[test]
fn every_field_comes_from_its_vocabulary() {
    let v = Vocabulary::default();
    for r in sample(8, 2_000) {
        assert!(v.channels.contains(&r.channel));
        assert!(v.interfaces.contains(&r.interface));
        assert!(v.mti_types.contains(&r.mti));
        assert!(v.approval_codes.contains(&r.approval_code));
        assert!(v.response_codes.contains(&r.response_code));
        assert!(v.products.contains(&r.product));
        assert!(v.terminal_names.contains(&r.terminal_name));
        assert!(v.originator_types.contains(&r.originator_type));
        assert!(v.terminal_countries.contains(&r.terminal_country));
        assert!(v.terminal_locations.contains(&r.terminal_location));
        assert!(v.pos_entry_modes.contains(&r.pos_entry_mode));
        assert!(v.mcc_codes.contains(&r.mcc));
        assert!(v.decline_reasons.iter().any(|o| o.narrative == r.decline_reason));
    }
}

#[test]
fn card_numbers_are_masked() {
    for r in sample(9, 2_000) {
        let card = r.card_no.as_str();
        assert_eq!(card.len(), 16);
        assert_eq!(&card[6..12], "******");
        assert!(card[..6].chars().all(|c| c.is_ascii_digit()));
        assert!(card[12..].chars().all(|c| c.is_ascii_digit()));
        assert!(card.starts_with('4') || card.starts_with('5'));
        // The serialized record only ever shows the masked form.
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains(card));
    }
}

#[test]
fn all_transaction_types_appear() {
    let records = sample(10, 2_000);
    for t in TransactionType::ALL {
        assert!(
            records.iter().any(|r| r.transaction_type == t),
            "{t} never generated"
        );
    }
}
