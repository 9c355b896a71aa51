//! mysql-easier
//!
//! An async convenience layer over MySQL pools and connections: generated
//! SQL for single-table CRUD on tables keyed by an auto-increment `id`, a
//! two-statement protocol that reports generated ids after insert and upsert,
//! and a transaction helper that commits or rolls back around a unit of work.
//!
//! ```no_run
//! use mysql_easier::{DbError, Fields, PoolConfig, Registry};
//!
//! # async fn demo() -> Result<(), DbError> {
//! let registry = Registry::new();
//! registry.configure(PoolConfig::from_url("mysql://root@localhost/demo")?).await?;
//!
//! let mut conn = registry.get_connection().await?;
//! let id = conn
//!     .insert("users", &Fields::new().with("username", "batman"))
//!     .await?;
//! let row = conn.get_by_id("users", id).await?;
//! conn.done().await?;
//!
//! registry.end_pool().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::{Config, PoolConfig};
pub use db::{Connection, ConnectionState, MySqlSession, Pool, Registry, Session, SessionKind};
pub use error::{DbError, DbResult};
pub use models::{Fields, MutationSummary, QueryOutcome, QueryParam, Row};
