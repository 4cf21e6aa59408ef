//! # SQLite Database methods
//!
//! Low-level SQLite interactions, written as free functions that take a `&mut SqliteConnection`. A caller can pass a
//! pooled connection, or `&mut *tx` to run several of them inside one transaction, without the functions needing to
//! know which.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod orders;
pub mod products;
pub mod settings;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/topup_store.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn db_url() -> String {
    let result = env::var("TOPUP_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ TOPUP_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    // The database file is created on first use, but its directory must already exist.
    // WAL lets readers carry on while a writer holds the lock. Writers queue for up to BUSY_TIMEOUT.
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Escapes `%`, `_` and the escape character itself, and wraps the term for a `LIKE ... ESCAPE '\'` substring match.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}
