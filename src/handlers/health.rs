//! Liveness: fixed body, no store access.

use crate::extractors::RequestEnvelope;
use crate::response::{ok, ResponseEnvelope};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody<'a> {
    status: &'static str,
    message: &'static str,
    timestamp: Option<&'a str>,
}

pub fn handle(event: &RequestEnvelope) -> ResponseEnvelope {
    let body = HealthBody {
        status: "healthy",
        message: "API is working!",
        timestamp: event.request_context.request_id.as_deref(),
    };
    ok(serde_json::to_value(body).unwrap_or_default())
}
