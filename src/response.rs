//! Standard response envelope: status, fixed CORS headers, JSON body.

use crate::error::AppError;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("Content-Type", "application/json"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
];

/// Outbound envelope handed back to the hosting platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ResponseEnvelope {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Body parsed back into JSON. Null when the body is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Build an envelope. Caller headers override the defaults key by key.
pub fn respond(status: StatusCode, body: Value, extra_headers: Option<&[(&str, &str)]>) -> ResponseEnvelope {
    let mut headers: BTreeMap<String, String> = DEFAULT_HEADERS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in extra_headers.unwrap_or(&[]) {
        // header names are case-insensitive; an override replaces any spelling of the same name
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(k));
        headers.insert(k.to_string(), v.to_string());
    }
    ResponseEnvelope {
        status_code: status.as_u16(),
        headers,
        body: body.to_string(),
    }
}

pub fn ok(body: Value) -> ResponseEnvelope {
    respond(StatusCode::OK, body, None)
}

pub fn created(body: Value) -> ResponseEnvelope {
    respond(StatusCode::CREATED, body, None)
}

pub fn error_body(message: String) -> Value {
    serde_json::json!({ "error": message })
}

impl From<AppError> for ResponseEnvelope {
    fn from(err: AppError) -> Self {
        respond(err.status(), error_body(err.to_string()), None)
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.body).into_response();
        let out = response.headers_mut();
        for (k, v) in &self.headers {
            match (HeaderName::try_from(k.as_str()), HeaderValue::from_str(v)) {
                (Ok(name), Ok(value)) => {
                    out.insert(name, value);
                }
                _ => tracing::warn!(header = %k, "dropping invalid response header"),
            }
        }
        if !out.contains_key(header::CONTENT_TYPE) {
            out.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn carries_default_cors_headers() {
        let env = respond(StatusCode::OK, json!({"a": 1}), None);
        assert_eq!(env.status_code, 200);
        assert_eq!(env.headers["Content-Type"], "application/json");
        assert_eq!(env.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(
            env.headers["Access-Control-Allow-Methods"],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(env.json(), json!({"a": 1}));
    }

    #[test]
    fn extra_headers_override_defaults() {
        let env = respond(
            StatusCode::CREATED,
            Value::Null,
            Some(&[("Access-Control-Allow-Origin", "https://app.example"), ("X-Trace", "1")]),
        );
        assert_eq!(env.headers["Access-Control-Allow-Origin"], "https://app.example");
        assert_eq!(env.headers["X-Trace"], "1");
        assert_eq!(env.headers.len(), DEFAULT_HEADERS.len() + 1);
    }

    #[test]
    fn override_replaces_header_regardless_of_case() {
        let env = respond(StatusCode::OK, Value::Null, Some(&[("content-type", "text/plain")]));
        let content_types: Vec<_> = env
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(content_types[0].1, "text/plain");
        assert_eq!(env.headers.len(), DEFAULT_HEADERS.len());

        let resp = env.into_response();
        assert_eq!(resp.headers()["content-type"], "text/plain");
    }

    #[test]
    fn serializes_as_platform_envelope() {
        let env = ok(json!([]));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["statusCode"], 200);
        assert_eq!(v["body"], "[]");
    }

    #[test]
    fn error_converts_to_error_body() {
        let env: ResponseEnvelope = AppError::not_found("User not found").into();
        assert_eq!(env.status(), StatusCode::NOT_FOUND);
        assert_eq!(env.json(), json!({"error": "User not found"}));
    }
}
