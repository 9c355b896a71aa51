//! SQL generation for single-table CRUD.
//!
//! Every function here is pure: it takes a table name (used verbatim, never
//! escaped, so it must come from trusted code) and optionally a field mapping,
//! and returns SQL text with positional `?` placeholders. Tables are expected
//! to have an auto-incrementing primary key named `id`.
//!
//! MySQL has no `INSERT ... RETURNING`, so insert and upsert produce an
//! [`IdentifiedStatement`]: the mutating statement plus a `SELECT
//! LAST_INSERT_ID()` that must run afterwards on the same session.

use crate::error::{DbError, DbResult};
use crate::models::Fields;

/// Reads the session-scoped id generated by the most recent insert.
pub const LAST_INSERT_ID_QUERY: &str = "SELECT LAST_INSERT_ID()";

/// SQL text plus the number of `?` placeholders it expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub param_count: usize,
}

impl Statement {
    fn new(sql: String, param_count: usize) -> Self {
        Self { sql, param_count }
    }
}

/// A mutating statement followed by the query that reads the generated id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedStatement {
    pub mutation: Statement,
    pub identifier_query: Statement,
}

pub fn delete_all(table: &str) -> Statement {
    Statement::new(format!("DELETE FROM {table}"), 0)
}

pub fn delete_by_id(table: &str) -> Statement {
    Statement::new(format!("DELETE FROM {table} WHERE id = ?"), 1)
}

pub fn get_all(table: &str) -> Statement {
    Statement::new(format!("SELECT * FROM {table}"), 0)
}

pub fn get_by_id(table: &str) -> Statement {
    Statement::new(format!("SELECT * FROM {table} WHERE id = ?"), 1)
}

/// `INSERT INTO t (c1, c2) VALUES (?, ?)`, one placeholder per field.
pub fn insert(table: &str, fields: &Fields) -> DbResult<IdentifiedStatement> {
    check_fields("insert", table, fields)?;
    Ok(IdentifiedStatement {
        mutation: insert_values(table, fields),
        identifier_query: identifier_query(),
    })
}

/// `UPDATE t SET c1 = ?, c2 = ? WHERE id = ?`.
///
/// Field values bind in mapping order and the id binds last.
pub fn update_by_id(table: &str, fields: &Fields) -> DbResult<Statement> {
    check_fields("update_by_id", table, fields)?;
    let sql = format!("UPDATE {table} SET {} WHERE id = ?", assignments(fields));
    Ok(Statement::new(sql, fields.len() + 1))
}

/// Insert, or on a unique-key conflict update every field again.
///
/// Field values bind twice: once for `VALUES`, once for the update list.
/// `id = LAST_INSERT_ID(id)` makes the identifier query report the existing
/// row's id when the update path is taken.
pub fn upsert(table: &str, fields: &Fields) -> DbResult<IdentifiedStatement> {
    check_fields("upsert", table, fields)?;
    let insert = insert_values(table, fields);
    let sql = format!(
        "{} ON DUPLICATE KEY UPDATE id = LAST_INSERT_ID(id), {}",
        insert.sql,
        assignments(fields)
    );
    Ok(IdentifiedStatement {
        mutation: Statement::new(sql, fields.len() * 2),
        identifier_query: identifier_query(),
    })
}

fn insert_values(table: &str, fields: &Fields) -> Statement {
    let columns = fields.columns().collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; fields.len()].join(", ");
    Statement::new(
        format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})"),
        fields.len(),
    )
}

fn assignments(fields: &Fields) -> String {
    fields
        .columns()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn identifier_query() -> Statement {
    Statement::new(LAST_INSERT_ID_QUERY.to_string(), 0)
}

fn check_fields(operation: &'static str, table: &str, fields: &Fields) -> DbResult<()> {
    if fields.is_empty() {
        return Err(DbError::empty_field_set(operation, table));
    }
    if fields.columns().any(|column| column.trim().is_empty()) {
        return Err(DbError::invalid_input(format!(
            "{operation} on '{table}': column names cannot be empty"
        )));
    }
    Ok(())
}
