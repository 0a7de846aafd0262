//! Resource handlers: users, languages, words, health.
//! Each maps method + resource template to one operation and converts every failure at a single boundary.

pub mod health;
pub mod languages;
pub mod users;
pub mod words;

use crate::error::AppError;
use crate::response::ResponseEnvelope;
use crate::sql::{Field, FieldKind, SqlValue};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Error boundary shared by all handlers.
pub(crate) fn finish(handler: &'static str, result: Result<ResponseEnvelope, AppError>) -> ResponseEnvelope {
    match result {
        Ok(resp) => resp,
        Err(e) => {
            if e.is_internal() {
                tracing::error!(handler, error = %e, "request failed");
            } else {
                tracing::debug!(handler, status = e.status().as_u16(), error = %e, "request rejected");
            }
            e.into()
        }
    }
}

/// Caller-supplied owner id from the query string; empty means absent.
pub(crate) fn owner_param<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str).filter(|s| !s.is_empty())
}

/// Bind `body[name]` (null when absent) as the given kind.
pub(crate) fn bind_field(body: &Map<String, Value>, name: &'static str, kind: FieldKind) -> Result<SqlValue, AppError> {
    Field::new(name, kind).bind(body.get(name).unwrap_or(&Value::Null))
}

/// First row of a RETURNING statement; an empty result is a store failure.
pub(crate) fn returned(row: Option<Value>) -> Result<Value, AppError> {
    row.ok_or(AppError::Db(sqlx::Error::RowNotFound))
}
