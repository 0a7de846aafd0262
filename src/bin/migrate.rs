//! Migration entry point: direct `up` / `status`, or a stack-lifecycle event document.

use clap::{Parser, Subcommand};
use conlang_backend::migration::{invoke, HttpCallback, InvocationContext, PgMigrations, MIGRATIONS};
use conlang_backend::{Database, Settings};
use serde_json::{json, Value};
use sqlx::postgres::PgSslMode;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "conlang-migrate", about = "Apply or inspect schema migrations", version)]
struct Cli {
    /// Log stream name reported to lifecycle callbacks. Defaults to `AWS_LAMBDA_LOG_STREAM_NAME`, then `local`.
    #[arg(long = "log-stream", value_name = "name")]
    log_stream: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply every pending migration.
    Up,
    /// Report applied and pending versions.
    Status,
    /// Handle an invocation document read from a file, or stdin when no file is given.
    Event {
        #[arg(value_name = "path")]
        file: Option<PathBuf>,
    },
}

fn read_event(file: Option<PathBuf>) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conlang_backend=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let event = match cli.command {
        Command::Up => json!({"action": "up"}),
        Command::Status => json!({"action": "status"}),
        Command::Event { file } => read_event(file)?,
    };
    let ctx = InvocationContext {
        log_stream_name: cli
            .log_stream
            .or_else(|| std::env::var("AWS_LAMBDA_LOG_STREAM_NAME").ok())
            .unwrap_or_else(|| "local".into()),
    };

    let settings = Settings::from_env(PgSslMode::Require)?;
    let db = Database::new(settings.secret_store().await, settings.secret_id.clone())
        .with_fallback_host(settings.db_endpoint.clone())
        .with_ssl_mode(settings.ssl_mode);
    let backend = PgMigrations::new(db);
    let callback = HttpCallback::new(Duration::from_secs(30))?;

    let result = invoke(&event, &backend, MIGRATIONS, &callback, &ctx).await;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if result.get("success").and_then(Value::as_bool) == Some(false) {
        std::process::exit(1);
    }
    Ok(())
}
