//! Account repository contract and SQLite implementation.
//!
//! # Invariants
//! - Email is the natural key: upserting an existing email updates that row
//!   and keeps its id.
//! - Blank names and a missing thumbnail never overwrite stored values.

use crate::db::DbHandle;
use crate::model::account::{Account, AccountProfile};
use crate::repo::{
    ensure_tables, int_to_bool, new_id, parse_id, RepoError, RepoResult, SQL_NOW_MS,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ACCOUNT_SELECT: &str = "SELECT
        id,
        email,
        first_name,
        last_name,
        is_active,
        provider,
        provider_account_id,
        thumbnail,
        last_login_at,
        created_at,
        updated_at
     FROM accounts";

/// Data access contract for accounts.
pub trait AccountRepository {
    /// Inserts or refreshes the account keyed by `profile.email` and stamps
    /// `last_login_at`.
    fn upsert_account(&self, db: &DbHandle<'_>, profile: &AccountProfile) -> RepoResult<Account>;
    fn get_account(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<Account>;
    fn get_account_by_email(&self, db: &DbHandle<'_>, email: &str) -> RepoResult<Account>;
}

/// SQLite-backed account repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteAccountRepository;

impl SqliteAccountRepository {
    /// Constructs a repository after checking the connection schema.
    pub fn try_new(conn: &Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["accounts"])?;
        Ok(Self)
    }
}

impl AccountRepository for SqliteAccountRepository {
    fn upsert_account(&self, db: &DbHandle<'_>, profile: &AccountProfile) -> RepoResult<Account> {
        let conn = db.conn()?;
        let sql = format!(
            "INSERT INTO accounts (
                id, email, first_name, last_name, provider, provider_account_id,
                thumbnail, last_login_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, {SQL_NOW_MS})
             ON CONFLICT (email) DO UPDATE SET
                first_name = CASE WHEN excluded.first_name <> '' THEN excluded.first_name ELSE accounts.first_name END,
                last_name = CASE WHEN excluded.last_name <> '' THEN excluded.last_name ELSE accounts.last_name END,
                provider = excluded.provider,
                provider_account_id = excluded.provider_account_id,
                thumbnail = COALESCE(excluded.thumbnail, accounts.thumbnail),
                last_login_at = excluded.last_login_at,
                updated_at = {SQL_NOW_MS};"
        );
        conn.execute(
            &sql,
            params![
                new_id(),
                profile.email,
                profile.first_name.trim(),
                profile.last_name.trim(),
                profile.provider.trim(),
                profile.provider_account_id.trim(),
                profile.thumbnail,
            ],
        )?;

        find_by_email(conn, &profile.email)?.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "account `{}` missing after upsert",
                profile.email
            ))
        })
    }

    fn get_account(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<Account> {
        let id = parse_id("account", id)?;
        let account = db
            .conn()?
            .query_row(
                &format!("{ACCOUNT_SELECT} WHERE id = ?1;"),
                [id.as_str()],
                RawAccount::from_row,
            )
            .optional()?;
        match account {
            Some(raw) => raw.into_account(),
            None => Err(RepoError::NotFound {
                entity: "account",
                id,
            }),
        }
    }

    fn get_account_by_email(&self, db: &DbHandle<'_>, email: &str) -> RepoResult<Account> {
        find_by_email(db.conn()?, email.trim())?.ok_or_else(|| RepoError::NotFound {
            entity: "account",
            id: email.to_string(),
        })
    }
}

fn find_by_email(conn: &Connection, email: &str) -> RepoResult<Option<Account>> {
    let raw = conn
        .query_row(
            &format!("{ACCOUNT_SELECT} WHERE email = ?1;"),
            [email],
            RawAccount::from_row,
        )
        .optional()?;
    raw.map(RawAccount::into_account).transpose()
}

/// Row image before integer flags are checked.
struct RawAccount {
    account: Account,
    is_active: i64,
}

impl RawAccount {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            account: Account {
                id: row.get("id")?,
                email: row.get("email")?,
                first_name: row.get("first_name")?,
                last_name: row.get("last_name")?,
                is_active: false,
                provider: row.get("provider")?,
                provider_account_id: row.get("provider_account_id")?,
                thumbnail: row.get("thumbnail")?,
                last_login_at: row.get("last_login_at")?,
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            },
            is_active: row.get("is_active")?,
        })
    }

    fn into_account(self) -> RepoResult<Account> {
        let mut account = self.account;
        account.is_active = int_to_bool("accounts.is_active", self.is_active)?;
        Ok(account)
    }
}
