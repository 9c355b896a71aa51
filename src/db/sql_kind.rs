//! Row-returning vs. mutating statement classification.
//!
//! `execute` must decide up front whether to collect rows or a mutation
//! summary: an empty `SELECT` looks exactly like a zero-row `DELETE` once it
//! has run. Statements are parsed with the MySQL dialect of
//! [sqlparser](https://docs.rs/sqlparser/); anything the parser rejects falls
//! back to its leading keyword.

use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

/// Leading keywords of statements that produce a result set.
const ROW_KEYWORDS: &[&str] = &[
    "SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH", "VALUES", "TABLE", "(",
];

/// Table maintenance statements and procedure calls answer with a result set
/// even though they parse as something else.
const RESULT_SET_KEYWORDS: &[&str] = &[
    "CHECK", "CHECKSUM", "ANALYZE", "OPTIMIZE", "REPAIR", "CALL",
];

/// Whether executing `sql` yields rows (as opposed to a mutation summary).
pub fn returns_rows(sql: &str) -> bool {
    if RESULT_SET_KEYWORDS.contains(&leading_keyword(sql).as_str()) {
        return true;
    }
    match Parser::parse_sql(&MySqlDialect {}, sql) {
        Ok(statements) => statements.last().is_some_and(is_row_statement),
        Err(_) => leading_keyword_returns_rows(sql),
    }
}

fn is_row_statement(stmt: &Statement) -> bool {
    matches!(
        stmt,
        Statement::Query(_)
            | Statement::ShowTables { .. }
            | Statement::ShowColumns { .. }
            | Statement::ShowDatabases { .. }
            | Statement::ShowSchemas { .. }
            | Statement::ShowCreate { .. }
            | Statement::ShowFunctions { .. }
            | Statement::ShowVariable { .. }
            | Statement::ShowVariables { .. }
            | Statement::ShowStatus { .. }
            | Statement::ShowCollation { .. }
            | Statement::ExplainTable { .. }
            | Statement::Explain { .. }
    )
}

fn leading_keyword(sql: &str) -> String {
    sql.trim_start()
        .split(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

fn leading_keyword_returns_rows(sql: &str) -> bool {
    if sql.trim_start().starts_with('(') {
        return true;
    }
    ROW_KEYWORDS.contains(&leading_keyword(sql).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_returns_rows() {
        assert!(returns_rows("SELECT * FROM users"));
        assert!(returns_rows("select * from users where id = ?"));
        assert!(returns_rows("SELECT LAST_INSERT_ID()"));
    }

    #[test]
    fn test_show_and_explain_return_rows() {
        assert!(returns_rows("SHOW TABLES"));
        assert!(returns_rows("EXPLAIN SELECT * FROM users"));
    }

    #[test]
    fn test_mutations_do_not_return_rows() {
        assert!(!returns_rows("DELETE FROM users"));
        assert!(!returns_rows("INSERT INTO users (username) VALUES (?)"));
        assert!(!returns_rows("UPDATE users SET username = ? WHERE id = ?"));
        assert!(!returns_rows(
            "INSERT INTO users (username) VALUES (?) \
             ON DUPLICATE KEY UPDATE id = LAST_INSERT_ID(id), username = ?"
        ));
        assert!(!returns_rows("CREATE TABLE t (id INT AUTO_INCREMENT PRIMARY KEY)"));
        assert!(!returns_rows("START TRANSACTION"));
    }

    #[test]
    fn test_table_maintenance_and_calls_return_rows() {
        assert!(returns_rows("CHECK TABLE users"));
        assert!(returns_rows("ANALYZE TABLE users"));
        assert!(returns_rows("optimize table users"));
        assert!(returns_rows("REPAIR TABLE users"));
        assert!(returns_rows("CHECKSUM TABLE users"));
        assert!(returns_rows("CALL refresh_totals(?)"));
    }

    #[test]
    fn test_leading_keyword() {
        assert_eq!(leading_keyword("  call proc()"), "CALL");
        assert_eq!(leading_keyword("COMMIT;"), "COMMIT");
        assert_eq!(leading_keyword(""), "");
    }

    #[test]
    fn test_insert_select_is_a_mutation() {
        assert!(!returns_rows("INSERT INTO archive SELECT * FROM users"));
    }

    #[test]
    fn test_unparseable_falls_back_to_keyword() {
        assert!(leading_keyword_returns_rows("  SELECT  @@whatever ~~ nonsense"));
        assert!(leading_keyword_returns_rows("show engine innodb status"));
        assert!(!leading_keyword_returns_rows("HANDLER t1 OPEN"));
        assert!(!leading_keyword_returns_rows(""));
    }
}
