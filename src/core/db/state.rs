use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use sqlx::{
    Sqlite, Transaction,
    pool::PoolConnection,
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
    },
};

pub(super) struct StoreState {
    db_file: Option<PathBuf>,
    pool: SqlitePool,
}

impl std::fmt::Debug for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("db_file", &self.db_file)
            .field("closed", &self.pool.is_closed())
            .finish()
    }
}

impl StoreState {
    pub(super) async fn conn(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    pub(super) async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Flush the WAL into the main database file and release all handles.
    /// Any later query on this store fails.
    pub(super) async fn close(&self) -> anyhow::Result<()> {
        if self.db_file.is_some() {
            sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
                .execute(&self.pool)
                .await?;
        }
        self.pool.close().await;
        Ok(())
    }

    pub(super) async fn open<P: AsRef<Path>>(
        db_file: P,
        max_connections: u32,
    ) -> anyhow::Result<Self> {
        let db_file = db_file.as_ref().to_path_buf();
        if let Some(parent) = db_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                anyhow::bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let connect_opts = SqliteConnectOptions::new()
            .filename(&db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open annotation database {:?}", db_file))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            db_file: Some(db_file),
            pool,
        })
    }

    /// A private database that lives as long as the store. Every pooled
    /// connection to `:memory:` is its own database, so the pool is pinned to a
    /// single connection that is never recycled.
    pub(super) async fn in_memory() -> anyhow::Result<Self> {
        let connect_opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_opts)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self {
            db_file: None,
            pool,
        })
    }
}
