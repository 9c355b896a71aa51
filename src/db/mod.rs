//! Database layer.
//!
//! This module provides:
//! - SQL generation for single-table CRUD
//! - Driver sessions and the connections wrapping them
//! - Connection pools and the pool registry
//! - Row decoding and parameter binding

pub mod connection;
pub(crate) mod params;
pub mod pool;
pub mod registry;
pub mod session;
pub mod sql_kind;
pub mod statement;
pub mod types;

pub use connection::{Connection, ConnectionState};
pub use pool::Pool;
pub use registry::Registry;
pub use session::{MySqlSession, Session, SessionKind};
pub use statement::{IdentifiedStatement, Statement};
