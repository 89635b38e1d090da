use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Cannot connect to store '{database}': {source}")]
    Connection {
        database: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Schema setup failed: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("Table '{table}' exists but lacks columns: {missing}")]
    SchemaMismatch { table: String, missing: String },

    #[error("Insert failed: {0}")]
    Insert(#[source] rusqlite::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Startup interrupted before the store was ready")]
    Interrupted,
}

impl FeedError {
    /// True for errors that should end the process with a failure status.
    /// Insert errors are recovered by the loop; `Interrupted` is a
    /// requested stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FeedError::Insert(_) | FeedError::Interrupted)
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
