//! Request validation: presence of required fields only.

use crate::error::AppError;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Every listed field must be present as a key (any value, including null).
    /// Reports the first missing field in list order.
    pub fn require(body: &Map<String, Value>, required: &[&str]) -> Result<(), AppError> {
        match required.iter().find(|f| !body.contains_key(**f)) {
            Some(missing) => Err(AppError::MissingField(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Path identifier, rejecting absent and empty values.
    pub fn path_id<'a>(id: Option<&'a String>, resource: &'static str) -> Result<&'a str, AppError> {
        id.map(String::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(AppError::MissingId(resource))
    }

    /// Rejects identifiers of uuid-keyed tables before they reach the database.
    pub fn uuid<'a>(id: &'a str, field: &'static str) -> Result<&'a str, AppError> {
        uuid::Uuid::parse_str(id)
            .map(|_| id)
            .map_err(|_| AppError::InvalidField { field, expected: "uuid" })
    }
}
