//! Persistence gateway contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define per-aggregate data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every call receives an explicit [`DbHandle`](crate::db::DbHandle); no
//!   repository opens or commits a transaction.
//! - Malformed ids fail with `InvalidId` before any SQL runs; lookups that
//!   miss fail with `NotFound`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::error::ErrorKind;
use rusqlite::{Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod account_repo;
pub mod note_repo;
pub mod template_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, id: String },
    InvalidId { entity: &'static str, value: String },
    /// Connection schema lacks a table this repository needs.
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Db(DbError::Cancelled) => ErrorKind::Cancelled,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidId { .. } => ErrorKind::InvalidId,
            Self::Db(_) | Self::MissingRequiredTable(_) | Self::InvalidData(_) => {
                ErrorKind::Infrastructure
            }
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidId { entity, value } => write!(f, "invalid {entity} id: `{value}`"),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::from(value))
    }
}

/// Validates an opaque id against the store's UUID format and returns its
/// canonical text form.
pub(crate) fn parse_id(entity: &'static str, value: &str) -> RepoResult<String> {
    Uuid::parse_str(value.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|_| RepoError::InvalidId {
            entity,
            value: value.to_string(),
        })
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Drops `None`, empty and whitespace-only filter values.
pub(crate) fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Builds a `LIKE` pattern matching `needle` anywhere, escaping wildcards.
///
/// Use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) const SQL_NOW_MS: &str = "(strftime('%s', 'now') * 1000)";

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

/// Fails with `NotFound` unless the account row exists.
pub(crate) fn ensure_account_exists(conn: &Connection, account_id: &str) -> RepoResult<()> {
    let found = conn
        .query_row(
            "SELECT 1 FROM accounts WHERE id = ?1;",
            [account_id],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(RepoError::NotFound {
            entity: "account",
            id: account_id.to_string(),
        });
    }
    Ok(())
}
