//! Connection pool management.
//!
//! A `Pool` lends out [`Connection`]s backed by a lazily connecting
//! `MySqlPool`. Lease accounting sits on top of the driver pool: a semaphore
//! with `connection_limit` permits decides who gets a session, which is what
//! gives `waitForConnections` and `queueLimit` their meaning. Once ended, a
//! pool lends nothing; connections already out stay usable and are closed
//! when they come back.

use crate::config::PoolConfig;
use crate::db::connection::Connection;
use crate::db::session::MySqlSession;
use crate::error::{DbError, DbResult};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, info, warn};

/// A pool of reusable MySQL sessions. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    pool: MySqlPool,
    leases: Arc<Semaphore>,
    /// Lease requests currently queued behind the limit
    waiting: AtomicUsize,
    ended: AtomicBool,
    config: PoolConfig,
}

/// Counts one queued lease request for as long as it is alive.
struct QueueSlot<'a>(&'a AtomicUsize);

impl<'a> QueueSlot<'a> {
    /// Join the queue, returning the slot and how many were already waiting.
    fn join(waiting: &'a AtomicUsize) -> (Self, usize) {
        let ahead = waiting.fetch_add(1, Ordering::AcqRel);
        (Self(waiting), ahead)
    }
}

impl Drop for QueueSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Pool {
    /// Create a pool. No session is opened until the first lease.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: PoolConfig) -> DbResult<Self> {
        config.validate()?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.connection_limit)
            .min_connections(0)
            .acquire_timeout(config.acquire_timeout_duration())
            .test_before_acquire(true)
            .connect_lazy_with(config.connect_options());

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            connection_limit = config.connection_limit,
            queue_limit = config.queue_limit,
            wait_for_connections = config.wait_for_connections,
            "Pool created"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                pool,
                leases: Arc::new(Semaphore::new(config.connection_limit as usize)),
                waiting: AtomicUsize::new(0),
                ended: AtomicBool::new(false),
                config,
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// Number of connections currently lent out. Leases outstanding when the
    /// pool ended are still counted until they come back.
    pub fn active_leases(&self) -> usize {
        let limit = self.inner.config.connection_limit as usize;
        limit.saturating_sub(self.inner.leases.available_permits())
    }

    /// Lease a connection. Release it with `done()` or discard it with
    /// `destroy()`.
    pub async fn get_connection(&self) -> DbResult<Connection> {
        if self.is_ended() {
            return Err(DbError::PoolEnded);
        }

        let permit = self.lease().await?;
        let conn = self.inner.pool.acquire().await?;
        let connection = Connection::new(
            MySqlSession::pooled(conn, permit),
            self.inner.config.debug,
        );

        debug!(
            connection_id = %connection.id(),
            database = %self.inner.config.database,
            "Connection leased"
        );
        Ok(connection)
    }

    async fn lease(&self) -> DbResult<OwnedSemaphorePermit> {
        let config = &self.inner.config;

        match Arc::clone(&self.inner.leases).try_acquire_owned() {
            Ok(permit) => return Ok(permit),
            Err(TryAcquireError::Closed) => return Err(DbError::PoolEnded),
            Err(TryAcquireError::NoPermits) => {}
        }

        if !config.wait_for_connections {
            return Err(DbError::driver(
                "No connections available.",
                None,
                "Release connections sooner, raise connectionLimit, or enable waitForConnections",
            ));
        }

        let (_slot, ahead) = QueueSlot::join(&self.inner.waiting);
        if config.queue_limit > 0 && ahead >= config.queue_limit {
            return Err(DbError::driver(
                "Queue limit reached.",
                None,
                "Raise queueLimit or connectionLimit",
            ));
        }

        debug!(waiting = ahead + 1, "Waiting for a free connection");

        let acquire = Arc::clone(&self.inner.leases).acquire_owned();
        match tokio::time::timeout(config.acquire_timeout_duration(), acquire).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(DbError::PoolEnded),
            Err(_elapsed) => Err(DbError::transient(
                format!(
                    "Timed out after {}ms waiting for a connection",
                    config.acquire_timeout
                ),
                "Increase acquireTimeout or connectionLimit, or release connections sooner",
            )),
        }
    }

    /// End the pool. Idle sessions close now; leased ones close when they
    /// are returned. Calling it again does nothing.
    pub fn end(&self) {
        if self.inner.ended.swap(true, Ordering::AcqRel) {
            debug!(database = %self.inner.config.database, "Pool already ended");
            return;
        }

        // Wakes queued requests with PoolEnded.
        self.inner.leases.close();

        // `close()` waits for leased sessions, so it must not block the caller.
        let pool = self.inner.pool.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    pool.close().await;
                    debug!("Pool drained");
                });
            }
            Err(_) => warn!("No runtime to drain the pool; sessions close when dropped"),
        }

        info!(database = %self.inner.config.database, "Pool ended");
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.inner.config)
            .field("ended", &self.is_ended())
            .field("active_leases", &self.active_leases())
            .finish()
    }
}
