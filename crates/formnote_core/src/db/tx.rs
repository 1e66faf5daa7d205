//! Transaction boundary and explicit handle passing.
//!
//! # Responsibility
//! - Own the SQLite connection used by one command.
//! - Run multi-statement writes all-or-nothing.
//! - Carry a cancellation token into every gateway call.
//!
//! # Invariants
//! - A failed or cancelled transaction is rolled back before the error is
//!   returned; the original error is returned unchanged.
//! - Repositories never open transactions themselves; they receive a
//!   [`DbHandle`] that already points at one (or at the plain connection).

use super::{open_db, open_db_in_memory, DbError, DbResult};
use log::{debug, error, warn};
use rusqlite::{Connection, InterruptHandle, TransactionBehavior};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared cancellation flag for one request.
///
/// Clones observe the same flag, so a caller can keep one clone and cancel
/// from another thread while the request runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with `DbError::Cancelled` once [`CancelToken::cancel`] was called.
    pub fn check(&self) -> DbResult<()> {
        if self.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        Ok(())
    }
}

/// Connection scope handed to every repository call.
///
/// Wraps either an open transaction or the plain connection.
pub struct DbHandle<'a> {
    conn: &'a Connection,
    cancel: &'a CancelToken,
    in_transaction: bool,
}

impl<'a> DbHandle<'a> {
    pub fn new(conn: &'a Connection, cancel: &'a CancelToken, in_transaction: bool) -> Self {
        Self {
            conn,
            cancel,
            in_transaction,
        }
    }

    /// Returns the connection after checking for cancellation.
    pub fn conn(&self) -> DbResult<&'a Connection> {
        self.cancel.check()?;
        Ok(self.conn)
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }
}

/// Transaction capability injected into services.
pub trait TxManager {
    /// Standalone handle for reads outside any transaction.
    fn handle<'a>(&'a self, cancel: &'a CancelToken) -> DbHandle<'a>;

    /// Runs `f` inside one transaction.
    ///
    /// Commits when `f` succeeds and the token is still live; otherwise
    /// rolls back and returns the error from `f` (or `Cancelled`).
    fn within_transaction<T, E, F>(&mut self, cancel: &CancelToken, f: F) -> Result<T, E>
    where
        E: From<DbError>,
        F: FnOnce(&DbHandle<'_>) -> Result<T, E>;
}

/// SQLite-backed store owning one migrated connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
        })
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
        })
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Raw connection access for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Handle that aborts the statement currently running on this store.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }
}

impl TxManager for SqliteStore {
    fn handle<'a>(&'a self, cancel: &'a CancelToken) -> DbHandle<'a> {
        DbHandle::new(&self.conn, cancel, false)
    }

    fn within_transaction<T, E, F>(&mut self, cancel: &CancelToken, f: F) -> Result<T, E>
    where
        E: From<DbError>,
        F: FnOnce(&DbHandle<'_>) -> Result<T, E>,
    {
        cancel.check()?;
        let started_at = Instant::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;

        let outcome = {
            let handle = DbHandle::new(&tx, cancel, true);
            f(&handle)
        };
        let outcome = outcome.and_then(|value| -> Result<T, E> {
            cancel.check()?;
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                tx.commit().map_err(DbError::from)?;
                debug!(
                    "event=tx_commit module=db status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!(
                        "event=tx_rollback module=db status=error duration_ms={} error={}",
                        started_at.elapsed().as_millis(),
                        rollback_err
                    );
                } else {
                    warn!(
                        "event=tx_rollback module=db status=ok duration_ms={} cancelled={}",
                        started_at.elapsed().as_millis(),
                        cancel.is_cancelled()
                    );
                }
                Err(err)
            }
        }
    }
}
