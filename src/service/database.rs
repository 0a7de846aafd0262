//! Database access: one connection and one transaction per statement.

use crate::error::AppError;
use crate::secrets::{DbCredentials, SecretStore};
use crate::sql::QueryBuf;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::Connection;
use std::sync::Arc;

/// What the caller wants back from a statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fetch {
    Rows,
    Count,
}

#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutput {
    Rows(Vec<Value>),
    Count(u64),
}

impl QueryOutput {
    pub fn into_rows(self) -> Vec<Value> {
        match self {
            QueryOutput::Rows(rows) => rows,
            QueryOutput::Count(_) => Vec::new(),
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            QueryOutput::Rows(rows) => rows.len() as u64,
            QueryOutput::Count(n) => *n,
        }
    }
}

/// Seam between handlers and the store. Each call is its own transaction.
#[async_trait]
pub trait DataAccess: Send + Sync {
    async fn run(&self, query: &QueryBuf, fetch: Fetch) -> Result<QueryOutput, AppError>;

    async fn fetch_all(&self, query: &QueryBuf) -> Result<Vec<Value>, AppError> {
        Ok(self.run(query, Fetch::Rows).await?.into_rows())
    }

    async fn fetch_optional(&self, query: &QueryBuf) -> Result<Option<Value>, AppError> {
        Ok(self.fetch_all(query).await?.into_iter().next())
    }

    async fn execute(&self, query: &QueryBuf) -> Result<u64, AppError> {
        Ok(self.run(query, Fetch::Count).await?.count())
    }
}

/// PostgreSQL access without pooling: credentials are fetched and a connection opened on every call.
#[derive(Clone)]
pub struct Database {
    secrets: Arc<dyn SecretStore>,
    secret_id: String,
    fallback_host: Option<String>,
    ssl_mode: PgSslMode,
}

impl Database {
    pub fn new(secrets: Arc<dyn SecretStore>, secret_id: impl Into<String>) -> Self {
        Database {
            secrets,
            secret_id: secret_id.into(),
            fallback_host: None,
            ssl_mode: PgSslMode::Prefer,
        }
    }

    pub fn with_fallback_host(mut self, host: Option<String>) -> Self {
        self.fallback_host = host;
        self
    }

    pub fn with_ssl_mode(mut self, mode: PgSslMode) -> Self {
        self.ssl_mode = mode;
        self
    }

    pub async fn credentials(&self) -> Result<DbCredentials, AppError> {
        let secret = self.secrets.get_secret(&self.secret_id).await?;
        DbCredentials::from_secret(&secret, self.fallback_host.as_deref())
    }

    /// Open a fresh connection. The caller owns closing it.
    pub async fn connect(&self) -> Result<PgConnection, AppError> {
        let creds = self.credentials().await?;
        let opts = PgConnectOptions::new()
            .host(&creds.host)
            .port(creds.port)
            .database(&creds.database)
            .username(&creds.username)
            .password(&creds.password)
            .ssl_mode(self.ssl_mode);
        let conn = PgConnection::connect_with(&opts).await?;
        tracing::debug!(host = %creds.host, database = %creds.database, "connected");
        Ok(conn)
    }
}

#[async_trait]
impl DataAccess for Database {
    async fn run(&self, query: &QueryBuf, fetch: Fetch) -> Result<QueryOutput, AppError> {
        let mut conn = self.connect().await?;
        let result = run_in_transaction(&mut conn, query, fetch).await;
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "closing connection failed");
        }
        result
    }
}

/// Run one statement inside its own transaction: commit on success, roll back on any failure.
pub async fn run_in_transaction(
    conn: &mut PgConnection,
    query: &QueryBuf,
    fetch: Fetch,
) -> Result<QueryOutput, AppError> {
    let mut tx = conn.begin().await?;
    match run_statement(&mut *tx, query, fetch).await {
        Ok(out) => {
            tx.commit().await?;
            Ok(out)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback().await {
                tracing::warn!(error = %rb, "rollback failed");
            }
            Err(e)
        }
    }
}

async fn run_statement(conn: &mut PgConnection, q: &QueryBuf, fetch: Fetch) -> Result<QueryOutput, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(p.clone());
    }
    match fetch {
        Fetch::Rows => {
            let rows = query.fetch_all(&mut *conn).await?;
            Ok(QueryOutput::Rows(rows.iter().map(row_to_json).collect()))
        }
        Fetch::Count => {
            let done = query.execute(&mut *conn).await?;
            Ok(QueryOutput::Count(done.rows_affected()))
        }
    }
}

/// Map a row to a JSON object keyed by column name. Timestamps become RFC 3339 strings.
pub fn row_to_json(row: &PgRow) -> Value {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        return serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<String>>, _>(name) {
        return Value::Array(v.into_iter().map(Value::String).collect());
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<f64>>, _>(name) {
        return Value::Array(
            v.into_iter()
                .map(|n| serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null))
                .collect(),
        );
    }
    Value::Null
}
