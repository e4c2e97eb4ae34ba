use crate::sql::SqlParseError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Unknown column {table}.{column}")]
    UnknownColumn { table: String, column: String },
    /// An input row named a natural-key value the remote table does not hold.
    #[error("No {table} row has {column} = {value:?}")]
    LookupMiss {
        table: String,
        column: String,
        value: String,
    },
    #[error("Row has no value for {0}")]
    MissingValue(String),
    #[error("Invalid date/time: {0:?}")]
    InvalidDate(String),
    #[error("Schema parse error: {0}")]
    SqlParse(#[from] SqlParseError),
    #[cfg(not(target_arch = "wasm32"))]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("CSV line {line} has {found} fields but the header has {expected}")]
    ExtraFields {
        line: u64,
        found: usize,
        expected: usize,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
