use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crawlsync_common::SyncError;

/// Thin wrapper around PgPool providing connection setup and lifecycle.
/// All store implementations in this crate share one client.
#[derive(Clone)]
pub struct StoreClient {
    pub(crate) pool: PgPool,
}

impl StoreClient {
    /// Connect to Postgres. An unreachable store is fatal for the run.
    pub async fn connect(database_url: &str) -> Result<Self, SyncError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), SyncError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Release all connections. Callers run this on every exit path,
    /// including after a failed pass.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Map a sqlx failure into the reconciliation error taxonomy.
pub(crate) fn map_sqlx(e: sqlx::Error) -> SyncError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            SyncError::DuplicateKey(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            SyncError::Connection(e.to_string())
        }
        _ => SyncError::Database(e.to_string()),
    }
}
