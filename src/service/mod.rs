//! Database access helper and request validation.

mod database;
mod validation;
pub use database::{row_to_json, run_in_transaction, DataAccess, Database, Fetch, QueryOutput};
pub use validation::RequestValidator;
