//! Local HTTP host for the resource handlers.

use conlang_backend::{app, AppState, Database, Settings};
use sqlx::postgres::PgSslMode;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conlang_backend=info")),
        )
        .init();

    let settings = Settings::from_env(PgSslMode::Prefer)?;
    let db = Database::new(settings.secret_store().await, settings.secret_id.clone())
        .with_fallback_host(settings.db_endpoint.clone())
        .with_ssl_mode(settings.ssl_mode);
    let router = app(AppState::new(db), settings.max_body_bytes);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
