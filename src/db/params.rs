//! Parameter binding for MySQL queries.
//!
//! Binds `QueryParam` values to `sqlx` query objects in placeholder order.

use crate::models::QueryParam;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    param: &'q QueryParam,
) -> Query<'q, MySql, MySqlArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::UInt(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
    }
}

/// Bind every parameter, in order.
pub(crate) fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [QueryParam],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = bind_mysql_param(query, param);
    }
    query
}
