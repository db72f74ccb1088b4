//! Store gateway over a SQLite pool.
//!
//! The `Database` handle is cloned into every component that needs storage.
//! Transactions roll back when dropped without `commit`, so a cancelled
//! request never leaves partial writes behind.

pub mod models;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl DatabaseOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect(&DatabaseOptions::new(database_url)).await
    }

    /// Open a file-backed pool in WAL mode.
    ///
    /// Writers queue on the busy timeout instead of failing with `SQLITE_BUSY`,
    /// which is what lets several transactions contend for the same rows.
    pub async fn connect(options: &DatabaseOptions) -> Result<Self, sqlx::Error> {
        let connect_options = SqliteConnectOptions::from_str(&options.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(connect_options)
            .await?;

        debug!(
            "Opened database pool at {} (max {} connections)",
            options.url, options.max_connections
        );
        Ok(Database { pool })
    }

    /// Single-connection in-memory database with the schema applied.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // The in-memory database lives as long as its only connection does
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await?;

        let database = Database { pool };
        database.run_migrations().await?;
        Ok(database)
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Upper bound on rows bound into one IN-list or VALUES list. Three binds per
/// row stays below SQLite's variable limit even on builds capped at 999.
pub const MAX_ROWS_PER_STATEMENT: usize = 300;

/// True when the store rejected a write because a unique or primary key already exists.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
