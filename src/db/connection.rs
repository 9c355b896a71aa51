//! Connections: one live session plus the CRUD and transaction helpers.
//!
//! A `Connection` starts `Open` and leaves that state exactly once, through
//! `done()` (pooled sessions go back to the pool, standalone ones close) or
//! `destroy()`. Every operation after that fails with
//! [`DbError::ConnectionUnavailable`].

use crate::config::PoolConfig;
use crate::db::session::{MySqlSession, Session, SessionKind};
use crate::db::statement::{self, IdentifiedStatement, Statement};
use crate::error::{DbError, DbResult};
use crate::models::{Fields, MutationSummary, QueryOutcome, QueryParam, Row};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value as JsonValue;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    /// Returned to its pool
    Released,
    /// Session terminated; the pool replaces it on demand
    Destroyed,
    /// Standalone session ended for good
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Released => write!(f, "released"),
            ConnectionState::Destroyed => write!(f, "destroyed"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// A leased or standalone database connection.
pub struct Connection<S: Session = MySqlSession> {
    id: String,
    kind: SessionKind,
    session: Option<S>,
    state: ConnectionState,
    /// Set between a successful begin and a successful commit or rollback
    in_transaction: bool,
    debug: bool,
}

impl Connection<MySqlSession> {
    /// Open a standalone connection outside any pool. `done()` closes it.
    pub async fn connect(config: &PoolConfig) -> DbResult<Self> {
        config.validate()?;
        let session = MySqlSession::connect(config).await?;
        let connection = Self::new(session, config.debug);
        info!(
            connection_id = %connection.id,
            host = %config.host,
            database = %config.database,
            "Standalone connection opened"
        );
        Ok(connection)
    }
}

impl<S: Session> Connection<S> {
    /// Wrap an open session. `debug` logs every statement before it runs.
    pub fn new(session: S, debug: bool) -> Self {
        Self {
            id: format!("conn_{}", uuid::Uuid::new_v4().simple()),
            kind: session.kind(),
            session: Some(session),
            state: ConnectionState::Open,
            in_transaction: false,
            debug,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Whether a transaction started by [`transaction`](Self::transaction)
    /// is still open on the session.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn session(&mut self) -> DbResult<&mut S> {
        if self.state != ConnectionState::Open {
            return Err(DbError::connection_unavailable(self.id.clone(), self.state));
        }
        self.session
            .as_mut()
            .ok_or_else(|| DbError::connection_unavailable(self.id.clone(), self.state))
    }

    /// Execute one statement with positional `?` parameters bound in order.
    pub async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        if self.debug {
            debug!(connection_id = %self.id, sql, params = ?params, "Executing statement");
        }
        self.session()?.execute(sql, params).await
    }

    /// Execute a row-returning statement and collect its rows.
    pub async fn query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<Vec<Row>> {
        Ok(self.execute(sql, params).await?.into_rows())
    }

    async fn run(&mut self, stmt: &Statement, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        if params.len() != stmt.param_count {
            return Err(DbError::invalid_input(format!(
                "statement expects {} parameters, got {}",
                stmt.param_count,
                params.len()
            )));
        }
        self.execute(&stmt.sql, params).await
    }

    /// Run the mutation, then read the generated id on the same session.
    async fn run_identified(
        &mut self,
        stmt: &IdentifiedStatement,
        params: &[QueryParam],
    ) -> DbResult<u64> {
        self.run(&stmt.mutation, params).await?;
        let outcome = self.run(&stmt.identifier_query, &[]).await?;
        outcome.first_value().and_then(identifier).ok_or_else(|| {
            DbError::driver(
                "LAST_INSERT_ID() returned no identifier",
                None,
                "Check that the table has an AUTO_INCREMENT id column",
            )
        })
    }

    pub async fn get_all(&mut self, table: &str) -> DbResult<Vec<Row>> {
        Ok(self.run(&statement::get_all(table), &[]).await?.into_rows())
    }

    /// The row with the given id, or `None` when it does not exist.
    pub async fn get_by_id(
        &mut self,
        table: &str,
        id: impl Into<QueryParam>,
    ) -> DbResult<Option<Row>> {
        let rows = self
            .run(&statement::get_by_id(table), &[id.into()])
            .await?
            .into_rows();
        Ok(rows.into_iter().next())
    }

    pub async fn delete_all(&mut self, table: &str) -> DbResult<MutationSummary> {
        Ok(self.run(&statement::delete_all(table), &[]).await?.into_summary())
    }

    pub async fn delete_by_id(
        &mut self,
        table: &str,
        id: impl Into<QueryParam>,
    ) -> DbResult<MutationSummary> {
        Ok(self
            .run(&statement::delete_by_id(table), &[id.into()])
            .await?
            .into_summary())
    }

    /// Update the given columns of one row. Values bind in field order, the id last.
    pub async fn update_by_id(
        &mut self,
        table: &str,
        id: impl Into<QueryParam>,
        fields: &Fields,
    ) -> DbResult<MutationSummary> {
        let stmt = statement::update_by_id(table, fields)?;
        let params: Vec<QueryParam> = fields
            .values()
            .cloned()
            .chain(std::iter::once(id.into()))
            .collect();
        Ok(self.run(&stmt, &params).await?.into_summary())
    }

    /// Insert one row and return its generated id.
    pub async fn insert(&mut self, table: &str, fields: &Fields) -> DbResult<u64> {
        let stmt = statement::insert(table, fields)?;
        let params: Vec<QueryParam> = fields.values().cloned().collect();
        self.run_identified(&stmt, &params).await
    }

    /// Insert one row, or update it on a unique-key conflict. Returns the id
    /// of the inserted or updated row.
    pub async fn upsert(&mut self, table: &str, fields: &Fields) -> DbResult<u64> {
        let stmt = statement::upsert(table, fields)?;
        let params: Vec<QueryParam> = fields.values().chain(fields.values()).cloned().collect();
        self.run_identified(&stmt, &params).await
    }

    /// Run `work` inside a transaction on this connection.
    ///
    /// Commits when `work` succeeds; a failed commit becomes the result.
    /// When `work` fails or panics the transaction is rolled back and the
    /// original error (or panic) is passed on; a failed rollback is only
    /// logged. The connection stays open either way; release it with
    /// [`done`](Self::done). If `work` releases the connection itself, or
    /// the returned future is dropped early, the open transaction is rolled
    /// back when the session is released. Transactions do not nest.
    ///
    /// ```no_run
    /// # use mysql_easier::{Connection, DbError, Fields};
    /// # async fn demo(conn: &mut Connection) -> Result<(), DbError> {
    /// let id = conn
    ///     .transaction(|conn| {
    ///         Box::pin(async move {
    ///             let id = conn.insert("users", &Fields::new().with("username", "batman")).await?;
    ///             conn.update_by_id("users", id, &Fields::new().with("password", "robin")).await?;
    ///             Ok::<_, DbError>(id)
    ///         })
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transaction<T, E, F>(&mut self, work: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut Self) -> BoxFuture<'c, Result<T, E>>,
        E: From<DbError>,
    {
        if self.in_transaction {
            return Err(DbError::invalid_input(format!(
                "connection {} already has an open transaction",
                self.id
            ))
            .into());
        }
        // Set before awaiting, so a begin cut short still gets rolled back.
        self.in_transaction = true;
        let begun = match self.session() {
            Ok(session) => session.begin().await,
            Err(e) => Err(e),
        };
        if let Err(e) = begun {
            self.in_transaction = false;
            return Err(e.into());
        }
        debug!(connection_id = %self.id, "Transaction started");

        let outcome = AssertUnwindSafe(work(&mut *self)).catch_unwind().await;

        match outcome {
            Ok(Ok(value)) => {
                self.session()?.commit().await?;
                self.in_transaction = false;
                info!(connection_id = %self.id, "Transaction committed");
                Ok(value)
            }
            Ok(Err(err)) => {
                self.rollback_after_failure().await;
                Err(err)
            }
            Err(panic) => {
                self.rollback_after_failure().await;
                std::panic::resume_unwind(panic)
            }
        }
    }

    async fn rollback_after_failure(&mut self) {
        let result = match self.session() {
            Ok(session) => session.rollback().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.in_transaction = false;
                info!(connection_id = %self.id, "Transaction rolled back");
            }
            Err(e) => warn!(
                connection_id = %self.id,
                error = %e,
                "Rollback failed; the original failure is returned"
            ),
        }
    }

    /// Release the connection: pooled sessions return to their pool,
    /// standalone sessions close. Calling it again does nothing.
    ///
    /// A transaction still open on the session is rolled back first; if that
    /// fails the session is destroyed rather than handed back.
    pub async fn done(&mut self) -> DbResult<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        if std::mem::take(&mut self.in_transaction) {
            if let Err(e) = session.rollback().await {
                warn!(
                    connection_id = %self.id,
                    error = %e,
                    "Rollback on release failed; destroying the session"
                );
                self.state = ConnectionState::Destroyed;
                return session.destroy().await;
            }
            warn!(connection_id = %self.id, "Open transaction rolled back on release");
        }
        self.state = match self.kind {
            SessionKind::Pooled => ConnectionState::Released,
            SessionKind::Standalone => ConnectionState::Closed,
        };
        debug!(connection_id = %self.id, state = %self.state, "Connection done");
        session.finish().await
    }

    /// Forcibly terminate the session instead of returning it. A no-op once
    /// the connection is no longer open.
    pub async fn destroy(&mut self) -> DbResult<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.state = ConnectionState::Destroyed;
        self.in_transaction = false;
        debug!(connection_id = %self.id, "Connection destroyed");
        session.destroy().await
    }
}

/// Identifier from the first column of `SELECT LAST_INSERT_ID()`; text
/// protocol results may arrive as strings.
fn identifier(value: &JsonValue) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

impl<S: Session> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .finish()
    }
}

impl<S: Session> Drop for Connection<S> {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if self.in_transaction {
            // No way to await a rollback here; the session must not be reused.
            session.abandon();
            warn!(
                connection_id = %self.id,
                kind = %self.kind,
                "Connection dropped inside a transaction - session abandoned"
            );
        } else {
            warn!(
                connection_id = %self.id,
                kind = %self.kind,
                "Connection dropped while open - call done() or destroy()"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!(ConnectionState::Released.to_string(), "released");
        assert_eq!(ConnectionState::Destroyed.to_string(), "destroyed");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_identifier_from_number_or_text() {
        assert_eq!(identifier(&json!(42)), Some(42));
        assert_eq!(identifier(&json!("42")), Some(42));
        assert_eq!(identifier(&json!(null)), None);
        assert_eq!(identifier(&json!(-1)), None);
    }
}
