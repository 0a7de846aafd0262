//! Ledger-driven migration runner.
//!
//! `pending` is every known migration whose version is absent from `schema_migrations`.
//! `run` applies the pending set in ascending version order and stops at the first failure;
//! migrations applied before the failure stay applied. Each apply executes the body and the
//! ledger upsert in one transaction, so a failed body leaves no ledger row behind.

use crate::error::AppError;
use crate::migration::Migration;
use crate::service::Database;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgConnection;
use sqlx::{Connection, Executor, Row};
use std::time::Instant;

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version VARCHAR(50) PRIMARY KEY,
    applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    checksum VARCHAR(64),
    execution_time_ms INTEGER,
    description TEXT
)";

const RECORD_APPLIED: &str = "INSERT INTO schema_migrations (version, applied_at, execution_time_ms, description) \
     VALUES ($1, NOW(), $2, $3) \
     ON CONFLICT (version) DO UPDATE SET applied_at = NOW(), execution_time_ms = EXCLUDED.execution_time_ms";

/// Ledger and schema access used by the runner.
#[async_trait]
pub trait MigrationStore: Send {
    async fn ensure_ledger(&mut self) -> Result<(), AppError>;

    /// Recorded versions, ascending.
    async fn applied_versions(&mut self) -> Result<Vec<String>, AppError>;

    /// Execute the body and record it. Returns elapsed milliseconds of the body.
    async fn apply(&mut self, migration: &Migration) -> Result<u64, AppError>;
}

/// Entry point for one runner operation. Each call acquires its own store and releases it before returning.
#[async_trait]
pub trait MigrationBackend: Send + Sync {
    async fn run_pending(&self, all: &[Migration]) -> Result<RunReport, AppError>;

    async fn report_status(&self, all: &[Migration]) -> Result<StatusReport, AppError>;
}

/// Ledger over a connection borrowed for the duration of one operation.
pub struct PgLedger<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgLedger<'c> {
    pub fn new(conn: &'c mut PgConnection) -> Self {
        PgLedger { conn }
    }
}

#[async_trait]
impl MigrationStore for PgLedger<'_> {
    async fn ensure_ledger(&mut self) -> Result<(), AppError> {
        sqlx::query(LEDGER_DDL).execute(&mut *self.conn).await?;
        tracing::debug!("ledger table ensured");
        Ok(())
    }

    async fn applied_versions(&mut self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT version FROM schema_migrations ORDER BY version")
            .fetch_all(&mut *self.conn)
            .await?;
        rows.iter()
            .map(|r| r.try_get::<String, _>("version").map_err(AppError::from))
            .collect()
    }

    async fn apply(&mut self, migration: &Migration) -> Result<u64, AppError> {
        let mut tx = self.conn.begin().await?;
        let start = Instant::now();
        (&mut *tx).execute(sqlx::raw_sql(migration.sql)).await?;
        let elapsed = start.elapsed().as_millis() as u64;
        sqlx::query(RECORD_APPLIED)
            .bind(migration.version)
            .bind(i32::try_from(elapsed).unwrap_or(i32::MAX))
            .bind(migration.description)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(elapsed)
    }
}

/// PostgreSQL backend: one connection per operation, closed on every path out.
pub struct PgMigrations {
    db: Database,
}

impl PgMigrations {
    pub fn new(db: Database) -> Self {
        PgMigrations { db }
    }

    async fn open(&self) -> Result<PgConnection, AppError> {
        let conn = self.db.connect().await?;
        tracing::info!("connected to database");
        Ok(conn)
    }
}

async fn release(conn: PgConnection) {
    match conn.close().await {
        Ok(()) => tracing::info!("disconnected from database"),
        Err(e) => tracing::warn!(error = %e, "closing connection failed"),
    }
}

#[async_trait]
impl MigrationBackend for PgMigrations {
    async fn run_pending(&self, all: &[Migration]) -> Result<RunReport, AppError> {
        let mut conn = self.open().await?;
        let result = run(&mut PgLedger::new(&mut conn), all).await;
        release(conn).await;
        result
    }

    async fn report_status(&self, all: &[Migration]) -> Result<StatusReport, AppError> {
        let mut conn = self.open().await?;
        let result = status(&mut PgLedger::new(&mut conn), all).await;
        release(conn).await;
        result
    }
}

/// Known migrations not yet recorded, in registry order.
pub fn pending<'a>(all: &'a [Migration], applied: &[String]) -> Vec<&'a Migration> {
    all.iter()
        .filter(|m| !applied.iter().any(|v| v == m.version))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedMigration {
    pub version: &'static str,
    pub description: &'static str,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub success: bool,
    pub message: String,
    pub applied_count: usize,
    pub applied_migrations: Vec<AppliedMigration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_execution_time_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub success: bool,
    pub total_migrations: usize,
    pub applied_count: usize,
    pub pending_count: usize,
    pub applied_migrations: Vec<String>,
    pub pending_migrations: Vec<&'static str>,
}

/// Apply every pending migration in order. The first failure aborts the run.
pub async fn run(store: &mut dyn MigrationStore, all: &[Migration]) -> Result<RunReport, AppError> {
    store.ensure_ledger().await?;
    let applied = store.applied_versions().await?;
    let todo = pending(all, &applied);

    if todo.is_empty() {
        tracing::info!("no pending migrations");
        return Ok(RunReport {
            success: true,
            message: "No pending migrations".into(),
            applied_count: 0,
            applied_migrations: Vec::new(),
            total_execution_time_ms: None,
        });
    }

    tracing::info!(count = todo.len(), "pending migrations found");
    let mut done = Vec::with_capacity(todo.len());
    let mut total = 0u64;
    for m in todo {
        tracing::info!(version = m.version, description = m.description, "applying migration");
        let ms = store.apply(m).await.map_err(|e| {
            tracing::error!(version = m.version, error = %e, "migration failed");
            e
        })?;
        tracing::info!(version = m.version, execution_time_ms = ms, "migration applied");
        total += ms;
        done.push(AppliedMigration {
            version: m.version,
            description: m.description,
            execution_time_ms: ms,
        });
    }

    tracing::info!(total_execution_time_ms = total, "all migrations applied");
    Ok(RunReport {
        success: true,
        message: format!("Applied {} migration(s)", done.len()),
        applied_count: done.len(),
        applied_migrations: done,
        total_execution_time_ms: Some(total),
    })
}

/// Known, applied and pending versions. Applies nothing.
pub async fn status(store: &mut dyn MigrationStore, all: &[Migration]) -> Result<StatusReport, AppError> {
    store.ensure_ledger().await?;
    let applied = store.applied_versions().await?;
    let todo: Vec<&'static str> = pending(all, &applied).iter().map(|m| m.version).collect();
    Ok(StatusReport {
        success: true,
        total_migrations: all.len(),
        applied_count: applied.len(),
        pending_count: todo.len(),
        applied_migrations: applied,
        pending_migrations: todo,
    })
}
