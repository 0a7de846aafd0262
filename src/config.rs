//! Environment-driven settings for both binaries.

use crate::error::AppError;
use crate::secrets::{AwsSecretsManager, EnvSecretStore, SecretStore};
use sqlx::postgres::PgSslMode;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Where database credentials come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecretSource {
    Aws,
    /// `SECRET_ARN` names an environment variable holding the secret JSON.
    Env,
}

impl FromStr for SecretSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aws" => Ok(SecretSource::Aws),
            "env" => Ok(SecretSource::Env),
            other => Err(AppError::Config(format!("SECRET_SOURCE must be aws or env, got {}", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub secret_id: String,
    pub secret_source: SecretSource,
    pub db_endpoint: Option<String>,
    pub ssl_mode: PgSslMode,
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
}

impl Settings {
    /// Read from the process environment. `default_ssl` differs between the API and the migration runner.
    pub fn from_env(default_ssl: PgSslMode) -> Result<Self, AppError> {
        Self::from_lookup(|k| std::env::var(k).ok(), default_ssl)
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>, default_ssl: PgSslMode) -> Result<Self, AppError> {
        let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());

        let secret_id = get("SECRET_ARN").ok_or_else(|| AppError::Config("SECRET_ARN is not set".into()))?;
        let secret_source = match get("SECRET_SOURCE") {
            Some(s) => s.parse()?,
            None => SecretSource::Aws,
        };
        let ssl_mode = match get("DB_SSL_MODE") {
            Some(s) => PgSslMode::from_str(&s).map_err(|e| AppError::Config(format!("DB_SSL_MODE: {}", e)))?,
            None => default_ssl,
        };
        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("BIND_ADDR: {}", e)))?;
        let max_body_bytes = match get("MAX_BODY_BYTES") {
            Some(s) => s
                .parse()
                .map_err(|e| AppError::Config(format!("MAX_BODY_BYTES: {}", e)))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Settings {
            secret_id,
            secret_source,
            db_endpoint: get("DB_ENDPOINT"),
            ssl_mode,
            bind_addr,
            max_body_bytes,
        })
    }

    pub async fn secret_store(&self) -> Arc<dyn SecretStore> {
        match self.secret_source {
            SecretSource::Aws => Arc::new(AwsSecretsManager::from_env().await),
            SecretSource::Env => Arc::new(EnvSecretStore),
        }
    }
}
