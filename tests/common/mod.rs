//! Shared test helpers: a scripted in-memory session that records every call.

#![allow(dead_code)]

use mysql_easier::models::{MutationSummary, QueryOutcome, QueryParam, Row};
use mysql_easier::{DbError, DbResult, Session, SessionKind};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One call a connection made on its session.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Execute { sql: String, params: Vec<QueryParam> },
    Begin,
    Commit,
    Rollback,
    Finish,
    Destroy,
    Abandon,
}

/// Which session calls should fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub begin: bool,
    pub commit: bool,
    pub rollback: bool,
}

/// Session double: answers `execute` from a queue of outcomes (an empty
/// mutation summary once the queue runs dry) and logs every call.
pub struct ScriptedSession {
    kind: SessionKind,
    calls: Arc<Mutex<Vec<Call>>>,
    outcomes: VecDeque<DbResult<QueryOutcome>>,
    failures: Failures,
}

impl ScriptedSession {
    pub fn new(kind: SessionKind) -> (Self, CallLog) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let session = Self {
            kind,
            calls: Arc::clone(&calls),
            outcomes: VecDeque::new(),
            failures: Failures::default(),
        };
        (session, CallLog(calls))
    }

    pub fn pooled() -> (Self, CallLog) {
        Self::new(SessionKind::Pooled)
    }

    pub fn standalone() -> (Self, CallLog) {
        Self::new(SessionKind::Standalone)
    }

    pub fn then(mut self, outcome: DbResult<QueryOutcome>) -> Self {
        self.outcomes.push_back(outcome);
        self
    }

    pub fn failing(mut self, failures: Failures) -> Self {
        self.failures = failures;
        self
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn result(&self, fail: bool, what: &str) -> DbResult<()> {
        if fail {
            Err(DbError::driver(format!("{what} failed"), None, "scripted failure"))
        } else {
            Ok(())
        }
    }
}

impl Session for ScriptedSession {
    fn kind(&self) -> SessionKind {
        self.kind
    }

    async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<QueryOutcome> {
        self.record(Call::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        self.outcomes
            .pop_front()
            .unwrap_or_else(|| Ok(QueryOutcome::Mutation(MutationSummary::default())))
    }

    async fn begin(&mut self) -> DbResult<()> {
        self.record(Call::Begin);
        self.result(self.failures.begin, "begin")
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.record(Call::Commit);
        self.result(self.failures.commit, "commit")
    }

    async fn rollback(&mut self) -> DbResult<()> {
        self.record(Call::Rollback);
        self.result(self.failures.rollback, "rollback")
    }

    async fn finish(self) -> DbResult<()> {
        self.record(Call::Finish);
        Ok(())
    }

    async fn destroy(self) -> DbResult<()> {
        self.record(Call::Destroy);
        Ok(())
    }

    fn abandon(self) {
        self.record(Call::Abandon);
    }
}

/// Read side of a scripted session's call log; outlives the session.
#[derive(Clone)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    /// Just the SQL of every executed statement, in order.
    pub fn statements(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute { sql, .. } => Some(sql),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }
}

pub fn execute(sql: &str, params: Vec<QueryParam>) -> Call {
    Call::Execute {
        sql: sql.to_string(),
        params,
    }
}

pub fn mutation(rows_affected: u64, last_insert_id: Option<u64>) -> DbResult<QueryOutcome> {
    Ok(QueryOutcome::Mutation(MutationSummary {
        rows_affected,
        last_insert_id,
    }))
}

/// A one-row, one-column result, as `SELECT LAST_INSERT_ID()` returns.
pub fn identifier_row(id: u64) -> DbResult<QueryOutcome> {
    let mut row = Row::new();
    row.insert("LAST_INSERT_ID()".to_string(), JsonValue::from(id));
    Ok(QueryOutcome::Rows(vec![row]))
}

pub fn rows(rows: Vec<JsonValue>) -> DbResult<QueryOutcome> {
    Ok(QueryOutcome::Rows(
        rows.into_iter()
            .filter_map(|value| match value {
                JsonValue::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
    ))
}
