//! Request envelope as delivered by the hosting platform (API-gateway proxy shape).

use crate::error::AppError;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// HTTP method, parsed once at the boundary.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Other(String),
}

impl From<String> for Method {
    fn from(s: String) -> Self {
        Method::from(s.as_str())
    }
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    #[serde(rename = "httpMethod")]
    pub method: Method,
    /// Resource path template, e.g. `/languages/{languageId}/words`.
    #[serde(default)]
    pub resource: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub path_parameters: HashMap<String, String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub query_string_parameters: HashMap<String, String>,
    /// Raw string payload or an already structured document.
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub request_context: RequestContext,
}

fn null_as_empty<'de, D>(d: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(d)?.unwrap_or_default())
}

impl RequestEnvelope {
    pub fn new(method: impl Into<Method>, resource: impl Into<String>) -> Self {
        RequestEnvelope {
            method: method.into(),
            resource: resource.into(),
            path_parameters: HashMap::new(),
            query_string_parameters: HashMap::new(),
            body: None,
            request_context: RequestContext::default(),
        }
    }

    pub fn with_path(mut self, key: &str, value: &str) -> Self {
        self.path_parameters.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query_string_parameters.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_context.request_id = Some(id.into());
        self
    }
}

pub fn path_params(event: &RequestEnvelope) -> &HashMap<String, String> {
    &event.path_parameters
}

pub fn query_params(event: &RequestEnvelope) -> &HashMap<String, String> {
    &event.query_string_parameters
}

/// Body as a JSON object. Absent or empty payloads yield an empty map; a string payload is parsed.
pub fn extract_body(event: &RequestEnvelope) -> Result<Map<String, Value>, AppError> {
    let parsed = match &event.body {
        None | Some(Value::Null) => return Ok(Map::new()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(Map::new()),
        Some(Value::String(s)) => serde_json::from_str::<Value>(s)?,
        Some(other) => other.clone(),
    };
    match parsed {
        Value::Object(m) => Ok(m),
        Value::Null => Ok(Map::new()),
        _ => Err(AppError::InvalidBody("body must be a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_gateway_event_with_null_parameters() {
        let event: RequestEnvelope = serde_json::from_value(json!({
            "httpMethod": "get",
            "resource": "/languages",
            "pathParameters": null,
            "queryStringParameters": null,
            "body": null
        }))
        .unwrap();
        assert_eq!(event.method, Method::Get);
        assert!(path_params(&event).is_empty());
        assert!(query_params(&event).is_empty());
        assert!(extract_body(&event).unwrap().is_empty());
    }

    #[test]
    fn string_body_is_parsed() {
        let event = RequestEnvelope::new("POST", "/users").with_body(json!("{\"user_id\":\"u1\"}"));
        let body = extract_body(&event).unwrap();
        assert_eq!(body["user_id"], "u1");
    }

    #[test]
    fn structured_body_passes_through() {
        let event = RequestEnvelope::new("PUT", "/words/{wordId}").with_body(json!({"ipa": "ka"}));
        assert_eq!(extract_body(&event).unwrap()["ipa"], "ka");
    }

    #[test]
    fn empty_string_body_is_empty_map() {
        let event = RequestEnvelope::new("POST", "/users").with_body(json!(""));
        assert!(extract_body(&event).unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_client_error() {
        let event = RequestEnvelope::new("POST", "/users").with_body(json!("{not json"));
        assert!(matches!(extract_body(&event), Err(AppError::InvalidBody(_))));
        let event = RequestEnvelope::new("POST", "/users").with_body(json!([1, 2]));
        assert!(matches!(extract_body(&event), Err(AppError::InvalidBody(_))));
    }

    #[test]
    fn unknown_methods_are_kept() {
        assert_eq!(Method::from("OPTIONS"), Method::Other("OPTIONS".into()));
        assert_eq!(Method::from("Delete"), Method::Delete);
    }
}
