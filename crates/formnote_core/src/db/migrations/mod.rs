//! Versioned schema upgrades.
//!
//! # Invariants
//! - Versions in [`MIGRATIONS`] start at 1 and increase by one.
//! - All pending steps run in a single immediate transaction; the stored
//!   `PRAGMA user_version` only moves when every step succeeded.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::{Connection, TransactionBehavior};

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "init_forms",
    sql: include_str!("0001_init.sql"),
}];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Brings `conn` up to [`latest_version`]. Returns the version found on
/// disk before upgrading.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<u32> {
    let found: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();
    if found > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > found).collect();
    if pending.is_empty() {
        debug!("event=db_migrate module=db status=noop schema_version={found}");
        return Ok(found);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for migration in pending {
        tx.execute_batch(migration.sql)
            .map_err(|source| DbError::Migration {
                version: migration.version,
                source,
            })?;
        tx.pragma_update(None, "user_version", migration.version)?;
        info!(
            "event=db_migrate module=db status=applied version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_contiguous() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1, "{}", migration.name);
        }
    }

    #[test]
    fn second_run_is_a_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
        assert_eq!(apply_migrations(&mut conn).unwrap(), latest_version());
    }

    #[test]
    fn failed_step_leaves_version_untouched() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE accounts (id TEXT);").unwrap();

        match apply_migrations(&mut conn).unwrap_err() {
            DbError::Migration { version, .. } => assert_eq!(version, 1),
            other => panic!("unexpected error: {other}"),
        }
        let version: u32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);
    }
}
