//! Conlang backend: CRUD handlers for users, languages, words and translations on PostgreSQL,
//! plus the schema migration runner.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod schema;
pub mod secrets;
pub mod service;
pub mod sql;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use error::AppError;
pub use extractors::RequestEnvelope;
pub use response::{respond, ResponseEnvelope};
pub use routes::{app, route};
pub use service::{DataAccess, Database};
pub use state::AppState;
