//! Shared handle for the local HTTP host.

use crate::service::DataAccess;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DataAccess>,
}

impl AppState {
    pub fn new(db: impl DataAccess + 'static) -> Self {
        AppState { db: Arc::new(db) }
    }
}
