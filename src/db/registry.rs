//! Application-wide pool registry.
//!
//! A `Registry` holds at most one configured [`Pool`] so code across an
//! application can lease connections without passing the pool around. Clone
//! the registry to share it; clones see the same pool.

use crate::config::PoolConfig;
use crate::db::connection::Connection;
use crate::db::pool::Pool;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct Registry {
    pool: Arc<RwLock<Option<Pool>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store the managed pool.
    ///
    /// Fails with [`DbError::AlreadyConfigured`] while a pool is stored; call
    /// [`end_pool`](Self::end_pool) first to reconfigure.
    pub async fn configure(&self, config: PoolConfig) -> DbResult<Pool> {
        let mut slot = self.pool.write().await;
        if slot.is_some() {
            return Err(DbError::AlreadyConfigured);
        }
        let pool = Pool::new(config)?;
        *slot = Some(pool.clone());
        info!(database = %pool.config().database, "Registry pool configured");
        Ok(pool)
    }

    pub async fn is_configured(&self) -> bool {
        self.pool.read().await.is_some()
    }

    /// The managed pool, if one is configured.
    pub async fn pool(&self) -> DbResult<Pool> {
        self.pool.read().await.clone().ok_or(DbError::NotConfigured)
    }

    /// Lease a connection from the managed pool.
    pub async fn get_connection(&self) -> DbResult<Connection> {
        // Lock released before waiting on the driver.
        let pool = self.pool().await?;
        pool.get_connection().await
    }

    /// End the managed pool and forget it, so `configure` may run again.
    pub async fn end_pool(&self) -> DbResult<()> {
        let pool = self.pool.write().await.take().ok_or(DbError::NotConfigured)?;
        pool.end();
        info!(database = %pool.config().database, "Registry pool ended");
        Ok(())
    }

    /// Create a pool the registry does not manage; the caller ends it.
    pub fn create_pool(&self, config: PoolConfig) -> DbResult<Pool> {
        Pool::new(config)
    }

    /// Open a standalone connection outside any pool; `done()` closes it.
    pub async fn create_connection(&self, config: &PoolConfig) -> DbResult<Connection> {
        Connection::connect(config).await
    }
}
