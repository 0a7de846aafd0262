//! Secret-store lookup: identifier in, string-keyed document out.

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

pub type SecretDocument = Map<String, Value>;

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get_secret(&self, id: &str) -> Result<SecretDocument, AppError>;
}

fn parse_document(id: &str, raw: &str) -> Result<SecretDocument, AppError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(m)) => Ok(m),
        Ok(_) => Err(AppError::Secret(format!("secret {} is not a JSON object", id))),
        Err(e) => Err(AppError::Secret(format!("secret {} is not valid JSON: {}", id, e))),
    }
}

/// AWS Secrets Manager. The client is built once; the secret value is fetched on every call.
pub struct AwsSecretsManager {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretsManager {
    pub async fn from_env() -> Self {
        let conf = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        AwsSecretsManager {
            client: aws_sdk_secretsmanager::Client::new(&conf),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretsManager {
    async fn get_secret(&self, id: &str) -> Result<SecretDocument, AppError> {
        let out = self
            .client
            .get_secret_value()
            .secret_id(id)
            .send()
            .await
            .map_err(|e| {
                AppError::Secret(format!(
                    "get_secret_value failed: {}",
                    aws_sdk_secretsmanager::error::DisplayErrorContext(&e)
                ))
            })?;
        let raw = out
            .secret_string()
            .ok_or_else(|| AppError::Secret(format!("secret {} has no string value", id)))?;
        parse_document(id, raw)
    }
}

/// Reads the secret JSON from the environment variable named by the identifier.
#[derive(Clone, Debug, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, id: &str) -> Result<SecretDocument, AppError> {
        let raw = std::env::var(id).map_err(|_| AppError::Secret(format!("environment variable {} not set", id)))?;
        parse_document(id, &raw)
    }
}

/// Fixed document, regardless of identifier.
#[derive(Clone, Debug)]
pub struct StaticSecretStore(pub SecretDocument);

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get_secret(&self, _id: &str) -> Result<SecretDocument, AppError> {
        Ok(self.0.clone())
    }
}

/// Connection credentials resolved from a secret document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

const DEFAULT_PORT: u16 = 5432;

impl DbCredentials {
    /// `host` falls back to `fallback_host`, `port` to 5432, `dbname` to `database`.
    pub fn from_secret(secret: &SecretDocument, fallback_host: Option<&str>) -> Result<Self, AppError> {
        let text = |key: &str| -> Option<String> {
            match secret.get(key) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            }
        };
        let required = |key: &'static str| -> Result<String, AppError> {
            text(key).ok_or_else(|| AppError::Secret(format!("secret is missing '{}'", key)))
        };

        let host = text("host")
            .filter(|h| !h.is_empty())
            .or_else(|| fallback_host.map(str::to_string))
            .ok_or_else(|| AppError::Secret("secret is missing 'host'".into()))?;
        let port = match text("port") {
            Some(p) => p
                .parse()
                .map_err(|_| AppError::Secret(format!("invalid port '{}'", p)))?,
            None => DEFAULT_PORT,
        };
        let database = text("dbname")
            .or_else(|| text("database"))
            .ok_or_else(|| AppError::Secret("secret is missing 'dbname'".into()))?;

        Ok(DbCredentials {
            host,
            port,
            database,
            username: required("username")?,
            password: required("password")?,
        })
    }
}
