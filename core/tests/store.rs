//! Store tests: schema setup, atomic inserts, connection failures.

use feed_core::{
    config::{StoreConfig, Vocabulary},
    error::FeedError,
    record::TransactionRecord,
    rng::{RngBank, StreamSlot},
    store::{FeedStore, TransactionSink},
    synthesizer::Synthesizer,
    types::Amount,
};

fn ready_store() -> FeedStore {
    let store = FeedStore::in_memory().expect("in-memory store");
    store.ensure_schema().expect("schema");
    store
}

fn records(seed: u64, n: usize) -> Vec<TransactionRecord> {
    let mut synth = Synthesizer::new(
        Vocabulary::default(),
        RngBank::new(seed).stream(StreamSlot::Synthesis),
    );
    (0..n).map(|_| synth.generate()).collect()
}

#[test]
fn ensure_schema_is_idempotent() {
    let store = FeedStore::in_memory().unwrap();
    assert!(!store.table_exists().unwrap());

    store.ensure_schema().unwrap();
    store.ensure_schema().unwrap();

    assert_eq!(store.table_count().unwrap(), 1);
    assert_eq!(store.record_count().unwrap(), 0);
}

#[test]
fn second_ensure_keeps_existing_rows() {
    let mut store = ready_store();
    for r in records(1, 3) {
        store.insert_record(&r).unwrap();
    }
    store.ensure_schema().unwrap();
    assert_eq!(store.record_count().unwrap(), 3);
}

#[test]
fn inserted_record_reads_back_field_for_field() {
    let mut store = ready_store();
    let record = records(2, 50)
        .into_iter()
        .find(|r| !r.transaction_amount.is_zero())
        .expect("a money-moving record");
    let id = store.insert_record(&record).unwrap();

    let rows = store.recent_records(1).unwrap();
    let row = &rows[0];
    assert_eq!(row.id, id);
    assert_eq!(row.time, record.time);
    assert_eq!(row.channel, record.channel);
    assert_eq!(row.interface, record.interface);
    assert_eq!(row.mti, record.mti);
    assert_eq!(row.card_no, record.card_no.as_str());
    assert_eq!(row.transaction_type, record.transaction_type);
    assert_eq!(row.transaction_amount, record.transaction_amount);
    assert_eq!(row.currency, record.currency);
    assert_eq!(row.approval_code, record.approval_code);
    assert_eq!(row.response_code, record.response_code);
    assert_eq!(row.rrn, record.rrn);
    assert_eq!(row.product, record.product);
    assert_eq!(row.terminal_name, record.terminal_name);
    assert_eq!(row.originator_type, record.originator_type);
    assert_eq!(row.terminal_country, record.terminal_country);
    assert_eq!(row.terminal_location, record.terminal_location);
    assert_eq!(row.billing_amount, record.billing_amount);
    assert_eq!(row.billing_currency, record.billing_currency);
    assert_eq!(row.pos_entry_mode, record.pos_entry_mode);
    assert_eq!(row.decline_reason, record.decline_reason);
    assert_eq!(row.mcc, record.mcc);
}

#[test]
fn zero_amounts_persist_as_zero() {
    let mut store = ready_store();
    let inquiry = records(3, 100)
        .into_iter()
        .find(|r| r.transaction_amount.is_zero())
        .expect("a zero-amount record");
    store.insert_record(&inquiry).unwrap();
    let row = &store.recent_records(1).unwrap()[0];
    assert_eq!(row.transaction_amount, Amount::ZERO);
    assert_eq!(row.billing_amount, Amount::ZERO);
}

#[test]
fn ids_are_sequential() {
    let mut store = ready_store();
    let ids: Vec<i64> = records(4, 5)
        .iter()
        .map(|r| store.insert_record(r).unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn rejected_insert_leaves_store_unchanged() {
    let mut store = ready_store();
    store.insert_record(&records(5, 1)[0]).unwrap();

    let mut bad = records(6, 1).remove(0);
    bad.channel = "X".repeat(80);
    let err = store.insert_record(&bad).unwrap_err();
    assert!(matches!(err, FeedError::Insert(_)), "{err}");
    assert!(!err.is_fatal());

    assert_eq!(store.record_count().unwrap(), 1);
    // The connection is still usable after the rollback.
    store.insert_record(&records(7, 1)[0]).unwrap();
    assert_eq!(store.record_count().unwrap(), 2);
}

#[test]
fn trigger_rejection_rolls_back() {
    let mut store = ready_store();
    store
        .execute_batch(
            "CREATE TRIGGER reject_all BEFORE INSERT ON transaction_log
             BEGIN SELECT RAISE(ABORT, 'feed paused'); END;",
        )
        .unwrap();
    let err = store.insert_record(&records(8, 1)[0]).unwrap_err();
    assert!(err.to_string().contains("Insert failed"), "{err}");
    assert_eq!(store.record_count().unwrap(), 0);
}

#[test]
fn insert_without_schema_is_an_insert_error() {
    let mut store = FeedStore::in_memory().unwrap();
    let err = store.insert(&records(9, 1)[0]).unwrap_err();
    assert!(matches!(err, FeedError::Insert(_)), "{err}");
}

#[test]
fn missing_database_is_a_connection_error() {
    let path = std::env::temp_dir()
        .join(format!("feed-missing-{}", std::process::id()))
        .join("absent.db");
    let config = StoreConfig {
        database: path.to_string_lossy().into_owned(),
        create_if_missing: false,
        ..StoreConfig::default()
    };
    let err = FeedStore::connect(&config).err().expect("connect must fail");
    assert!(matches!(err, FeedError::Connection { .. }), "{err}");
    assert!(err.is_fatal());
}

#[test]
fn file_store_survives_reconnect() {
    let dir = std::env::temp_dir().join(format!("feed-store-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("reconnect.db");
    let _ = std::fs::remove_file(&path);
    let config = StoreConfig {
        database: path.to_string_lossy().into_owned(),
        ..StoreConfig::default()
    };

    let mut first = FeedStore::connect(&config).unwrap();
    first.ensure_schema().unwrap();
    first.insert_record(&records(10, 1)[0]).unwrap();
    first.close().unwrap();

    let second = FeedStore::connect(&config).unwrap();
    second.ensure_schema().unwrap();
    assert_eq!(second.table_count().unwrap(), 1);
    assert_eq!(second.record_count().unwrap(), 1);
    second.close().unwrap();

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn existing_table_with_wrong_shape_is_a_schema_error() {
    let store = FeedStore::in_memory().unwrap();
    store
        .execute_batch(
            "CREATE TABLE transaction_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                time DATETIME NOT NULL,
                note TEXT
            );",
        )
        .unwrap();

    let err = store.ensure_schema().unwrap_err();
    match &err {
        FeedError::SchemaMismatch { table, missing } => {
            assert_eq!(table, "transaction_log");
            assert!(missing.contains("channel"), "{missing}");
            assert!(missing.contains("mcc"), "{missing}");
            assert!(!missing.contains("time"), "{missing}");
        }
        other => panic!("expected a schema mismatch, got {other}"),
    }
    assert!(err.is_fatal());
}

#[test]
fn unknown_transaction_type_fails_read_back() {
    let mut store = ready_store();
    store.insert_record(&records(11, 1)[0]).unwrap();
    store
        .execute_batch("UPDATE transaction_log SET transaction_type = 'REFUND';")
        .unwrap();
    assert!(store.recent_records(1).is_err());
}
