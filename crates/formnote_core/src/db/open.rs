//! Connection bootstrap.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`; field and section
//!   cascades depend on it.
//! - Returned connections are at [`latest_version`].

use super::migrations::{apply_migrations, latest_version};
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) a database file and upgrades its schema.
///
/// # Side effects
/// - Emits one `db_open` event on success or failure.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_logged("file", || Connection::open(path))
}

/// Opens a private in-memory database with the full schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_logged("memory", Connection::open_in_memory)
}

fn open_logged<F>(mode: &str, connect: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    let result = connect()
        .map_err(Into::into)
        .and_then(|mut conn| configure(&mut conn).map(|from| (conn, from)));

    match result {
        Ok((conn, from_version)) => {
            info!(
                "event=db_open module=db status=ok mode={mode} from_version={from_version} schema_version={} duration_ms={}",
                latest_version(),
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn configure(conn: &mut Connection) -> DbResult<u32> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}
