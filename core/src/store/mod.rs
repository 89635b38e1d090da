//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The feed loop hands records to a TransactionSink; it never executes SQL.
//! Every value reaches SQLite as a bound parameter.

use crate::{
    config::StoreConfig,
    error::{FeedError, FeedResult},
    record::{TransactionRecord, TransactionType},
    types::{Amount, RecordId},
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags};
use std::time::Duration;

pub const TABLE: &str = "transaction_log";

/// Column length limits, mirrored by the CHECK constraints in the migration.
pub mod limits {
    pub const CHANNEL: usize = 50;
    pub const INTERFACE: usize = 20;
    pub const MTI: usize = 10;
    pub const CARD_NO: usize = 50;
    pub const CURRENCY: usize = 10;
    pub const APPROVAL_CODE: usize = 20;
    pub const RESPONSE_CODE: usize = 20;
    pub const RRN: usize = 50;
    pub const PRODUCT: usize = 100;
    pub const TERMINAL_NAME: usize = 100;
    pub const ORIGINATOR_TYPE: usize = 50;
    pub const TERMINAL_COUNTRY: usize = 50;
    pub const TERMINAL_LOCATION: usize = 100;
    pub const POS_ENTRY_MODE: usize = 50;
    pub const DECLINE_REASON: usize = 200;
    pub const MCC: usize = 10;
}

/// Every column the insert and read-back paths rely on.
const COLUMNS: [&str; 22] = [
    "id",
    "time",
    "channel",
    "interface",
    "mti",
    "card_no",
    "transaction_type",
    "transaction_amount",
    "currency",
    "approval_code",
    "response_code",
    "rrn",
    "product",
    "terminal_name",
    "originator_type",
    "terminal_country",
    "terminal_location",
    "billing_amount",
    "billing_currency",
    "pos_entry_mode",
    "decline_reason",
    "mcc",
];

const INSERT_SQL: &str = "INSERT INTO transaction_log (
        time, channel, interface, mti, card_no, transaction_type,
        transaction_amount, currency, approval_code, response_code,
        rrn, product, terminal_name, originator_type, terminal_country,
        terminal_location, billing_amount, billing_currency,
        pos_entry_mode, decline_reason, mcc
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
              ?17, ?18, ?19, ?20, ?21)";

/// Where the feed loop sends records.
pub trait TransactionSink {
    /// Persist one record atomically. On error nothing was written.
    fn insert(&mut self, record: &TransactionRecord) -> FeedResult<RecordId>;

    /// Release the underlying connection.
    fn close(self) -> FeedResult<()>
    where
        Self: Sized;
}

/// A persisted row, read back for summaries and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub time: NaiveDateTime,
    pub channel: String,
    pub interface: String,
    pub mti: String,
    pub card_no: String,
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
}

pub struct FeedStore {
    conn: Connection,
    database: String,
}

impl FeedStore {
    /// Open the store described by `config` and check it answers.
    pub fn connect(config: &StoreConfig) -> FeedResult<Self> {
        let connection_error = |source| FeedError::Connection {
            database: config.database.clone(),
            source,
        };

        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        let conn = Connection::open_with_flags(&config.database, flags).map_err(connection_error)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(connection_error)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(connection_error)?;

        // In-memory databases refuse WAL; that is not worth failing over.
        if let Some(mode) = &config.journal_mode {
            if let Err(e) = conn.pragma_update(None, "journal_mode", mode) {
                log::warn!("store: journal_mode={mode} not applied: {e}");
            }
        }

        log::debug!("store: connected to {}", config.database);
        Ok(Self {
            conn,
            database: config.database.clone(),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FeedResult<Self> {
        Self::connect(&StoreConfig::in_memory())
    }

    /// Create the destination table if it does not exist. Safe to call on
    /// every startup; a second call changes nothing. A pre-existing table
    /// missing any expected column is a schema error.
    pub fn ensure_schema(&self) -> FeedResult<()> {
        let existed = self.table_exists().map_err(into_schema_error)?;
        self.conn
            .execute_batch(include_str!("../../../migrations/001_transaction_log.sql"))
            .map_err(FeedError::Schema)?;
        let missing = self.missing_columns().map_err(into_schema_error)?;
        if !missing.is_empty() {
            return Err(FeedError::SchemaMismatch {
                table: TABLE.to_string(),
                missing: missing.join(", "),
            });
        }
        if existed {
            log::debug!("store: {TABLE} already present");
        } else {
            log::info!("store: {TABLE} table created");
        }
        Ok(())
    }

    pub fn table_exists(&self) -> FeedResult<bool> {
        Ok(self.table_count()? > 0)
    }

    fn missing_columns(&self) -> FeedResult<Vec<&'static str>> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let present = stmt
            .query_map(params![TABLE], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(COLUMNS
            .into_iter()
            .filter(|c| !present.iter().any(|p| p.as_str() == *c))
            .collect())
    }

    /// Number of tables named `transaction_log`; exactly 1 after setup.
    pub fn table_count(&self) -> FeedResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![TABLE],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Insert one record inside its own transaction. Commit on success;
    /// the transaction rolls back when dropped on any error path.
    pub fn insert_record(&mut self, r: &TransactionRecord) -> FeedResult<RecordId> {
        let tx = self.conn.transaction().map_err(FeedError::Insert)?;
        tx.execute(
            INSERT_SQL,
            params![
                r.time,
                r.channel,
                r.interface,
                r.mti,
                r.card_no,
                r.transaction_type.code(),
                r.transaction_amount,
                r.currency,
                r.approval_code,
                r.response_code,
                r.rrn,
                r.product,
                r.terminal_name,
                r.originator_type,
                r.terminal_country,
                r.terminal_location,
                r.billing_amount,
                r.billing_currency,
                r.pos_entry_mode,
                r.decline_reason,
                r.mcc,
            ],
        )
        .map_err(FeedError::Insert)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(FeedError::Insert)?;
        Ok(id)
    }

    pub fn record_count(&self) -> FeedResult<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM transaction_log", [], |row| row.get(0))?;
        Ok(count)
    }

    /// The newest `limit` rows, newest first.
    pub fn recent_records(&self, limit: usize) -> FeedResult<Vec<StoredRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, time, channel, interface, mti, card_no, transaction_type,
                    transaction_amount, currency, approval_code, response_code,
                    rrn, product, terminal_name, originator_type, terminal_country,
                    terminal_location, billing_amount, billing_currency,
                    pos_entry_mode, decline_reason, mcc
             FROM transaction_log ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(StoredRecord {
                id: row.get(0)?,
                time: row.get(1)?,
                channel: row.get(2)?,
                interface: row.get(3)?,
                mti: row.get(4)?,
                card_no: row.get(5)?,
                transaction_type: row.get(6)?,
                transaction_amount: row.get(7)?,
                currency: row.get(8)?,
                approval_code: row.get(9)?,
                response_code: row.get(10)?,
                rrn: row.get(11)?,
                product: row.get(12)?,
                terminal_name: row.get(13)?,
                originator_type: row.get(14)?,
                terminal_country: row.get(15)?,
                terminal_location: row.get(16)?,
                billing_amount: row.get(17)?,
                billing_currency: row.get(18)?,
                pos_entry_mode: row.get(19)?,
                decline_reason: row.get(20)?,
                mcc: row.get(21)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Run raw SQL against the store. Test fixtures use this to install
    /// triggers that reject specific rows.
    pub fn execute_batch(&self, sql: &str) -> FeedResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

fn into_schema_error(e: FeedError) -> FeedError {
    match e {
        FeedError::Database(source) => FeedError::Schema(source),
        other => other,
    }
}

impl TransactionSink for FeedStore {
    fn insert(&mut self, record: &TransactionRecord) -> FeedResult<RecordId> {
        self.insert_record(record)
    }

    fn close(self) -> FeedResult<()> {
        let database = self.database;
        self.conn.close().map_err(|(_, e)| FeedError::Database(e))?;
        log::info!("store: connection to {database} closed");
        Ok(())
    }
}
