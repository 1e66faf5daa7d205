//! Storage layer: connection bootstrap, schema upgrades, transactions.
//!
//! # Responsibility
//! - Hand out connections that already carry the current schema.
//! - Own the transaction boundary ([`TxManager`]) and per-call
//!   cancellation ([`CancelToken`]).
//!
//! # Invariants
//! - No repository touches a connection that has not been migrated.
//! - Every gateway call goes through a [`DbHandle`] and observes its
//!   [`CancelToken`].

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod tx;

pub use open::{open_db, open_db_in_memory};
pub use tx::{CancelToken, DbHandle, SqliteStore, TxManager};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The request was cancelled before or while the call ran.
    Cancelled,
    /// The on-disk schema was written by a newer build.
    UnsupportedSchemaVersion { db_version: u32, latest_supported: u32 },
    Migration { version: u32, source: rusqlite::Error },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::Cancelled => f.write_str("operation cancelled"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "schema version {db_version} is not supported (this build knows up to {latest_supported})"
            ),
            Self::Migration { version, source } => {
                write!(f, "migration {version} failed: {source}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::Cancelled | Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        // Raised by statements stopped through `SqliteStore::interrupt_handle`.
        if value.sqlite_error_code() == Some(rusqlite::ErrorCode::OperationInterrupted) {
            return Self::Cancelled;
        }
        Self::Sqlite(value)
    }
}
