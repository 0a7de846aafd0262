//! Local HTTP host: turns axum requests into request envelopes and writes the response envelope back.

use crate::extractors::{RequestContext, RequestEnvelope};
use crate::response::ResponseEnvelope;
use crate::routes::route;
use crate::state::AppState;
use axum::extract::{DefaultBodyLimit, MatchedPath, Path, Query, State};
use axum::http::Method;
use axum::routing::any;
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

/// Templates served by the resource handlers, in axum path syntax.
const TEMPLATES: &[&str] = &[
    "/users",
    "/users/:userId",
    "/users/:userId/languages",
    "/languages",
    "/languages/:languageId",
    "/languages/:languageId/words",
    "/words",
    "/words/:wordId",
    "/health",
];

/// `/users/:userId` -> `/users/{userId}`.
fn resource_template(matched: &str) -> String {
    matched
        .split('/')
        .map(|seg| match seg.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => seg.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

async fn forward(
    State(state): State<AppState>,
    method: Method,
    matched: MatchedPath,
    path: Option<Path<HashMap<String, String>>>,
    query: Option<Query<HashMap<String, String>>>,
    body: String,
) -> ResponseEnvelope {
    let mut event = RequestEnvelope::new(method.as_str(), resource_template(matched.as_str()));
    event.path_parameters = path.map(|Path(p)| p).unwrap_or_default();
    event.query_string_parameters = query.map(|Query(q)| q).unwrap_or_default();
    if !body.is_empty() {
        event.body = Some(Value::String(body));
    }
    event.request_context = RequestContext {
        request_id: Some(uuid::Uuid::new_v4().to_string()),
    };
    tracing::debug!(method = %method, resource = %event.resource, "request");
    route(state.db.as_ref(), &event).await
}

/// Resource routes wrapped with a request body limit.
pub fn api_routes(state: AppState, max_body_bytes: usize) -> Router {
    let router = TEMPLATES
        .iter()
        .fold(Router::new(), |r, t| r.route(t, any(forward)));
    router
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(max_body_bytes)),
        )
        .with_state(state)
}
