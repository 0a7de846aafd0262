//! Typed errors and HTTP status mapping.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("{0} ID is required")]
    MissingId(&'static str),
    #[error("No fields to update")]
    NoFieldsToUpdate,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("invalid value for field '{field}': expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
    #[error("{0}")]
    NotFound(String),
    #[error("Access denied")]
    Forbidden,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    Db(#[from] sqlx::Error),
    #[error("secret: {0}")]
    Secret(String),
    #[error("config: {0}")]
    Config(String),
    #[error("{0}")]
    Migration(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingField(_)
            | AppError::MissingId(_)
            | AppError::NoFieldsToUpdate
            | AppError::InvalidBody(_)
            | AppError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Db(_) | AppError::Secret(_) | AppError::Config(_) | AppError::Migration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True for failures of the surrounding infrastructure rather than the request.
    pub fn is_internal(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::InvalidBody(e.to_string())
    }
}
