//! Builds parameterized INSERT and UPDATE statements from fixed field descriptors.

use crate::error::AppError;
use crate::sql::SqlValue;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (identifiers only ever come from descriptors).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table descriptor: name, key column and the key's SQL type (parameters are cast to it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub key: &'static str,
    pub key_type: &'static str,
}

impl Table {
    pub fn qualified(&self) -> String {
        quoted(self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Bool,
    Uuid,
    Json,
    TextArray,
    FloatArray,
}

/// One writable column and how its JSON value binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Field { name, kind }
    }

    pub fn bind(&self, v: &Value) -> Result<SqlValue, AppError> {
        let invalid = |expected: &'static str| AppError::InvalidField {
            field: self.name,
            expected,
        };
        Ok(match self.kind {
            FieldKind::Text => match v {
                Value::Null => SqlValue::Text(None),
                Value::String(s) => SqlValue::Text(Some(s.clone())),
                Value::Number(n) => SqlValue::Text(Some(n.to_string())),
                Value::Bool(b) => SqlValue::Text(Some(b.to_string())),
                _ => return Err(invalid("string")),
            },
            FieldKind::Bool => match v {
                Value::Null => SqlValue::Bool(None),
                Value::Bool(b) => SqlValue::Bool(Some(*b)),
                _ => return Err(invalid("boolean")),
            },
            FieldKind::Uuid => match v {
                Value::Null => SqlValue::Uuid(None),
                Value::String(s) => SqlValue::Uuid(Some(
                    uuid::Uuid::parse_str(s).map_err(|_| invalid("uuid"))?,
                )),
                _ => return Err(invalid("uuid")),
            },
            FieldKind::Json => SqlValue::Json(v.clone()),
            FieldKind::TextArray => match v {
                Value::Null => SqlValue::TextArray(None),
                Value::Array(items) => SqlValue::TextArray(Some(
                    items
                        .iter()
                        .map(|i| i.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| invalid("array of strings"))?,
                )),
                _ => return Err(invalid("array of strings")),
            },
            FieldKind::FloatArray => match v {
                Value::Null => SqlValue::FloatArray(None),
                Value::Array(items) => SqlValue::FloatArray(Some(
                    items
                        .iter()
                        .map(Value::as_f64)
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| invalid("array of numbers"))?,
                )),
                _ => return Err(invalid("array of numbers")),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryBuf {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter (builder style). Placeholders in `sql` are numbered by push order.
    pub fn bind(mut self, v: impl Into<SqlValue>) -> Self {
        self.params.push(v.into());
        self
    }

    fn push_param(&mut self, v: SqlValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

fn insert_head(table: &Table, values: Vec<(&'static str, SqlValue)>) -> QueryBuf {
    let mut q = QueryBuf::new(String::new());
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (col, v) in values {
        let n = q.push_param(v);
        cols.push(quoted(col));
        placeholders.push(format!("${}", n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.qualified(),
        cols.join(", "),
        placeholders.join(", ")
    );
    q
}

/// INSERT of the given (column, value) pairs, RETURNING every column.
pub fn insert(table: &Table, values: Vec<(&'static str, SqlValue)>) -> QueryBuf {
    let mut q = insert_head(table, values);
    q.sql.push_str(" RETURNING *");
    q
}

/// INSERT ... ON CONFLICT (key) DO UPDATE of `update_cols` from the proposed row, RETURNING every column.
pub fn upsert(table: &Table, values: Vec<(&'static str, SqlValue)>, update_cols: &[&str]) -> QueryBuf {
    let mut q = insert_head(table, values);
    let sets: Vec<String> = update_cols
        .iter()
        .map(|c| format!("{} = EXCLUDED.{}", quoted(c), quoted(c)))
        .collect();
    q.sql = format!(
        "{} ON CONFLICT ({}) DO UPDATE SET {} RETURNING *",
        q.sql,
        quoted(table.key),
        sets.join(", ")
    );
    q
}

/// UPDATE by key: SET only the descriptor fields present in `body`, in descriptor order.
/// Fails with `NoFieldsToUpdate` when none is present.
pub fn update(table: &Table, fields: &[Field], id: &str, body: &Map<String, Value>) -> Result<QueryBuf, AppError> {
    let mut q = QueryBuf::new(String::new());
    let mut sets = Vec::new();
    for field in fields {
        let Some(v) = body.get(field.name) else { continue };
        let n = q.push_param(field.bind(v)?);
        sets.push(format!("{} = ${}", quoted(field.name), n));
    }
    if sets.is_empty() {
        return Err(AppError::NoFieldsToUpdate);
    }
    let id_param = q.push_param(SqlValue::text(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}::{} RETURNING *",
        table.qualified(),
        sets.join(", "),
        quoted(table.key),
        id_param,
        table.key_type
    );
    Ok(q)
}
