//! Invocation protocol for the migration entry point.
//!
//! Two shapes are accepted: a stack-lifecycle notification (`RequestType` Create/Update/Delete,
//! optionally with a `ResponseURL` to PUT the outcome to), or a direct `{"action": "up"|"status"}`.
//! Stack deletion never touches the schema.

use crate::error::AppError;
use crate::migration::{Migration, MigrationBackend};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StackEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL", default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Up,
    Status,
    Unknown(String),
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        match s {
            "up" => Action::Up,
            "status" => Action::Status,
            other => Action::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Stack(StackEvent),
    Direct(Action),
}

impl Invocation {
    /// A recognised `RequestType` makes a lifecycle event; anything else is a direct action (default `up`).
    pub fn parse(event: &Value) -> Self {
        if event.get("RequestType").is_some() {
            if let Ok(stack) = serde_json::from_value::<StackEvent>(event.clone()) {
                return Invocation::Stack(stack);
            }
        }
        let action = match event.get("action") {
            Some(Value::String(s)) => Action::from(s.as_str()),
            Some(Value::Null) | None => Action::Up,
            Some(other) => Action::Unknown(other.to_string()),
        };
        Invocation::Direct(action)
    }
}

/// Names the log stream reported to the lifecycle callback.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub log_stream_name: String,
}

/// Outcome document PUT to the lifecycle callback address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackBody {
    pub status: &'static str,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: Value,
}

#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn send(&self, url: &str, body: &CallbackBody) -> Result<(), AppError>;
}

/// PUTs the callback body as JSON.
pub struct HttpCallback {
    client: reqwest::Client,
}

impl HttpCallback {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("http client: {}", e)))?;
        Ok(HttpCallback { client })
    }
}

#[async_trait]
impl CallbackSender for HttpCallback {
    async fn send(&self, url: &str, body: &CallbackBody) -> Result<(), AppError> {
        let resp = self
            .client
            .put(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Migration(format!("callback delivery failed: {}", e)))?;
        let code = resp.status();
        if !code.is_success() {
            return Err(AppError::Migration(format!("callback rejected with {}", code)));
        }
        Ok(())
    }
}

fn run_document(result: Result<crate::migration::RunReport, AppError>) -> Value {
    match result {
        Ok(report) => serde_json::to_value(report).unwrap_or_default(),
        Err(e) => {
            tracing::error!(error = %e, "migration run failed");
            json!({
                "success": false,
                "message": format!("Migration failed: {}", e),
                "error": e.to_string(),
            })
        }
    }
}

fn status_document(result: Result<crate::migration::StatusReport, AppError>) -> Value {
    match result {
        Ok(report) => serde_json::to_value(report).unwrap_or_default(),
        Err(e) => {
            tracing::error!(error = %e, "migration status failed");
            json!({ "success": false, "error": e.to_string() })
        }
    }
}

/// Handle one invocation and return its result document. A connection is held only while a run or
/// status read is in progress.
pub async fn invoke(
    event: &Value,
    backend: &dyn MigrationBackend,
    migrations: &[Migration],
    callback: &dyn CallbackSender,
    ctx: &InvocationContext,
) -> Value {
    let invocation = Invocation::parse(event);
    tracing::info!(?invocation, "migration entry point invoked");

    match &invocation {
        Invocation::Stack(stack) => match stack.request_type {
            RequestType::Create | RequestType::Update => {
                let doc = run_document(backend.run_pending(migrations).await);
                notify(callback, stack, ctx, doc.clone()).await;
                doc
            }
            RequestType::Delete => {
                tracing::info!("stack deletion, no action taken");
                notify(callback, stack, ctx, json!({"message": "No action taken on stack deletion"})).await;
                json!({"success": true, "message": "No action taken"})
            }
        },
        Invocation::Direct(Action::Up) => run_document(backend.run_pending(migrations).await),
        Invocation::Direct(Action::Status) => status_document(backend.report_status(migrations).await),
        Invocation::Direct(Action::Unknown(a)) => {
            json!({"success": false, "error": format!("Unknown action: {}", a)})
        }
    }
}

/// Deliver the outcome when the event carries a callback address. Failures are logged only.
async fn notify(callback: &dyn CallbackSender, stack: &StackEvent, ctx: &InvocationContext, data: Value) {
    let Some(url) = stack.response_url.as_deref() else {
        return;
    };
    let succeeded = data.get("success").and_then(Value::as_bool).unwrap_or(true);
    let body = CallbackBody {
        status: if succeeded { "SUCCESS" } else { "FAILED" },
        reason: format!("See log stream: {}", ctx.log_stream_name),
        physical_resource_id: ctx.log_stream_name.clone(),
        stack_id: stack.stack_id.clone(),
        request_id: stack.request_id.clone(),
        logical_resource_id: stack.logical_resource_id.clone(),
        data,
    };
    match callback.send(url, &body).await {
        Ok(()) => tracing::info!(status = body.status, "lifecycle callback delivered"),
        Err(e) => tracing::error!(error = %e, "lifecycle callback failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::fake::{MemoryBackend, MemoryStore};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    const KNOWN: &[Migration] = &[
        Migration { version: "v1", description: "one", sql: "SELECT 1" },
        Migration { version: "v2", description: "two", sql: "SELECT 2" },
    ];

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, CallbackBody)>>,
        fail: bool,
    }

    #[async_trait]
    impl CallbackSender for Recorder {
        async fn send(&self, url: &str, body: &CallbackBody) -> Result<(), AppError> {
            self.sent.lock().unwrap().push((url.to_string(), body.clone()));
            if self.fail {
                return Err(AppError::Migration("connection reset".into()));
            }
            Ok(())
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext {
            log_stream_name: "2025/01/01/[$LATEST]abc".into(),
        }
    }

    fn stack_event(kind: &str) -> Value {
        json!({
            "RequestType": kind,
            "ResponseURL": "https://callback.example/put",
            "StackId": "stack-1",
            "RequestId": "req-1",
            "LogicalResourceId": "Migrations",
        })
    }

    #[test]
    fn parses_both_shapes() {
        assert!(matches!(Invocation::parse(&stack_event("Create")), Invocation::Stack(_)));
        assert_eq!(Invocation::parse(&json!({})), Invocation::Direct(Action::Up));
        assert_eq!(Invocation::parse(&json!({"action": "status"})), Invocation::Direct(Action::Status));
        assert_eq!(
            Invocation::parse(&json!({"RequestType": "Rollback", "action": "down"})),
            Invocation::Direct(Action::Unknown("down".into()))
        );
    }

    fn counts(backend: &MemoryBackend) -> (usize, usize) {
        (backend.opened.load(Ordering::SeqCst), backend.released.load(Ordering::SeqCst))
    }

    #[tokio::test]
    async fn create_runs_and_reports_success() {
        let backend = MemoryBackend::new(MemoryStore::default());
        let cb = Recorder::default();
        let doc = invoke(&stack_event("Create"), &backend, KNOWN, &cb, &ctx()).await;
        assert_eq!(doc["applied_count"], 2);
        assert_eq!(counts(&backend), (1, 1));

        let sent = cb.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (url, body) = &sent[0];
        assert_eq!(url, "https://callback.example/put");
        assert_eq!(body.status, "SUCCESS");
        assert_eq!(body.reason, "See log stream: 2025/01/01/[$LATEST]abc");
        assert_eq!(body.physical_resource_id, "2025/01/01/[$LATEST]abc");
        assert_eq!(body.data, doc);
        let wire = serde_json::to_value(body).unwrap();
        assert_eq!(wire["LogicalResourceId"], "Migrations");
    }

    #[tokio::test]
    async fn delete_leaves_schema_alone() {
        let backend = MemoryBackend::new(MemoryStore::default());
        let cb = Recorder::default();
        let doc = invoke(&stack_event("Delete"), &backend, KNOWN, &cb, &ctx()).await;
        assert_eq!(doc, json!({"success": true, "message": "No action taken"}));
        assert!(backend.store.lock().await.executed.is_empty());
        assert_eq!(counts(&backend), (0, 0));
        let sent = cb.sent.lock().unwrap();
        assert_eq!(sent[0].1.data, json!({"message": "No action taken on stack deletion"}));
    }

    #[tokio::test]
    async fn failed_run_is_reported_as_failed() {
        let backend = MemoryBackend::new(MemoryStore {
            fail_on: Some("v2"),
            ..Default::default()
        });
        let cb = Recorder::default();
        let doc = invoke(&stack_event("Update"), &backend, KNOWN, &cb, &ctx()).await;
        assert_eq!(doc["success"], false);
        assert_eq!(doc["message"], "Migration failed: syntax error in v2");
        assert_eq!(doc["error"], "syntax error in v2");
        assert_eq!(cb.sent.lock().unwrap()[0].1.status, "FAILED");
        assert_eq!(counts(&backend), (1, 1));
    }

    #[tokio::test]
    async fn callback_failure_does_not_change_result() {
        let backend = MemoryBackend::new(MemoryStore::default());
        let cb = Recorder {
            fail: true,
            ..Default::default()
        };
        let doc = invoke(&stack_event("Create"), &backend, KNOWN, &cb, &ctx()).await;
        assert_eq!(doc["success"], true);
    }

    #[tokio::test]
    async fn direct_actions() {
        let cb = Recorder::default();
        let backend = MemoryBackend::new(MemoryStore {
            ledger: vec!["v1".into()],
            ..Default::default()
        });
        let st = invoke(&json!({"action": "status"}), &backend, KNOWN, &cb, &ctx()).await;
        assert_eq!(st["pending_migrations"], json!(["v2"]));
        assert!(backend.store.lock().await.executed.is_empty());
        assert_eq!(counts(&backend), (1, 1));

        let up = invoke(&json!({}), &backend, KNOWN, &cb, &ctx()).await;
        assert_eq!(up["applied_migrations"][0]["version"], "v2");
        assert_eq!(counts(&backend), (2, 2));

        let bad = invoke(&json!({"action": "down"}), &backend, KNOWN, &cb, &ctx()).await;
        assert_eq!(bad, json!({"success": false, "error": "Unknown action: down"}));
        assert_eq!(counts(&backend), (2, 2));
        assert!(cb.sent.lock().unwrap().is_empty());
    }
}
