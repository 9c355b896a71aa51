//! Driver sessions.
//!
//! A `Session` is one live database session as the connection layer sees it:
//! run a statement, control a transaction, and leave either gracefully
//! (`finish`) or forcibly (`destroy`). `MySqlSession` is the sqlx-backed
//! implementation; how it leaves depends on whether it came from a pool.

use crate::config::PoolConfig;
use crate::db::{params, sql_kind, types};
use crate::error::DbResult;
use crate::models::{MutationSummary, QueryOutcome, QueryParam};
use sqlx::mysql::{MySqlConnection, MySqlQueryResult};
use sqlx::pool::PoolConnection;
use sqlx::{ConnectOptions, Connection as _, Executor, MySql};
use std::future::Future;
use tokio::sync::OwnedSemaphorePermit;

/// Where a session came from, which decides what `finish` does with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Leased from a pool; finishing returns it.
    Pooled,
    /// Opened on its own; finishing closes it.
    Standalone,
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Pooled => write!(f, "pooled"),
            SessionKind::Standalone => write!(f, "standalone"),
        }
    }
}

/// Minimal capability set the connection layer needs from a driver session.
///
/// Every method resolves exactly once. Statements on one session never
/// overlap because every method takes the session mutably or by value.
pub trait Session: Send {
    fn kind(&self) -> SessionKind;

    /// Run one statement with positional parameters bound in order.
    fn execute(
        &mut self,
        sql: &str,
        params: &[QueryParam],
    ) -> impl Future<Output = DbResult<QueryOutcome>> + Send;

    fn begin(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = DbResult<()>> + Send;

    /// Leave gracefully: return a pooled session, close a standalone one.
    fn finish(self) -> impl Future<Output = DbResult<()>> + Send;

    /// Terminate the underlying session. A pool opens a replacement on demand.
    fn destroy(self) -> impl Future<Output = DbResult<()>> + Send;

    /// Give the session up without awaiting anything, so it cannot be reused.
    /// The server discards whatever transaction was open on it.
    fn abandon(self);
}

/// A MySQL session, either leased from a pool or opened standalone.
pub enum MySqlSession {
    Pooled {
        conn: PoolConnection<MySql>,
        /// Lease slot held until the session goes back to the pool.
        permit: OwnedSemaphorePermit,
    },
    Standalone(MySqlConnection),
}

impl MySqlSession {
    pub(crate) fn pooled(conn: PoolConnection<MySql>, permit: OwnedSemaphorePermit) -> Self {
        Self::Pooled { conn, permit }
    }

    /// Open a standalone session outside any pool.
    pub async fn connect(config: &PoolConfig) -> DbResult<Self> {
        let conn = config.connect_options().connect().await?;
        Ok(Self::Standalone(conn))
    }

    fn connection(&mut self) -> &mut MySqlConnection {
        match self {
            Self::Pooled { conn, .. } => &mut **conn,
            Self::Standalone(conn) => conn,
        }
    }

    async fn run_raw(&mut self, sql: &'static str) -> DbResult<()> {
        self.connection().execute(sql).await?;
        Ok(())
    }
}

impl std::fmt::Debug for MySqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MySqlSession").field(&self.kind()).finish()
    }
}

fn summarize(result: &MySqlQueryResult) -> MutationSummary {
    MutationSummary {
        rows_affected: result.rows_affected(),
        last_insert_id: Some(result.last_insert_id()).filter(|id| *id != 0),
    }
}

impl Session for MySqlSession {
    fn kind(&self) -> SessionKind {
        match self {
            Self::Pooled { .. } => SessionKind::Pooled,
            Self::Standalone(_) => SessionKind::Standalone,
        }
    }

    async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        let conn = self.connection();

        // Without parameters the text protocol is used, so statements the
        // server cannot prepare (SHOW, some DDL) still run.
        if sql_kind::returns_rows(sql) {
            let rows = if params.is_empty() {
                conn.fetch_all(sql).await?
            } else {
                params::bind_all(sqlx::query(sql), params)
                    .fetch_all(&mut *conn)
                    .await?
            };
            Ok(QueryOutcome::Rows(rows.iter().map(types::row_to_json).collect()))
        } else {
            let result = if params.is_empty() {
                conn.execute(sql).await?
            } else {
                params::bind_all(sqlx::query(sql), params)
                    .execute(&mut *conn)
                    .await?
            };
            Ok(QueryOutcome::Mutation(summarize(&result)))
        }
    }

    async fn begin(&mut self) -> DbResult<()> {
        self.run_raw("START TRANSACTION").await
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.run_raw("COMMIT").await
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.run_raw("ROLLBACK").await
    }

    async fn finish(self) -> DbResult<()> {
        match self {
            Self::Pooled { conn, permit } => {
                // Back to the pool before the lease slot frees up.
                drop(conn);
                drop(permit);
                Ok(())
            }
            Self::Standalone(conn) => {
                conn.close().await?;
                Ok(())
            }
        }
    }

    async fn destroy(self) -> DbResult<()> {
        match self {
            Self::Pooled { conn, permit } => {
                let closed = conn.close().await;
                drop(permit);
                closed?;
                Ok(())
            }
            Self::Standalone(conn) => {
                // Dropping closes the socket without the polite goodbye.
                drop(conn);
                Ok(())
            }
        }
    }

    fn abandon(self) {
        match self {
            Self::Pooled { conn, permit } => {
                // Detached, the socket closes here and the pool opens a replacement.
                drop(conn.detach());
                drop(permit);
            }
            Self::Standalone(conn) => drop(conn),
        }
    }
}
