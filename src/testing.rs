//! Scripted data access for handler tests: records statements, replays queued outputs.

use crate::error::AppError;
use crate::service::{DataAccess, Fetch, QueryOutput};
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub struct ScriptedDb {
    replies: Mutex<VecDeque<Result<QueryOutput, String>>>,
    seen: Mutex<Vec<QueryBuf>>,
}

impl ScriptedDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(self, rows: Vec<Value>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(QueryOutput::Rows(rows)));
        self
    }

    pub fn count(self, n: u64) -> Self {
        self.replies.lock().unwrap().push_back(Ok(QueryOutput::Count(n)));
        self
    }

    pub fn fail(self, msg: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(msg.to_string()));
        self
    }

    pub fn statements(&self) -> Vec<QueryBuf> {
        self.seen.lock().unwrap().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|q| q.sql).collect()
    }
}

#[async_trait]
impl DataAccess for ScriptedDb {
    async fn run(&self, query: &QueryBuf, fetch: Fetch) -> Result<QueryOutput, AppError> {
        self.seen.lock().unwrap().push(query.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Ok(out)) => Ok(out),
            Some(Err(msg)) => Err(AppError::Db(sqlx::Error::Protocol(msg))),
            None => Ok(match fetch {
                Fetch::Rows => QueryOutput::Rows(Vec::new()),
                Fetch::Count => QueryOutput::Count(0),
            }),
        }
    }
}
