//! Routing: resource-template dispatch plus the axum host around it.

mod api;
mod common;
mod dispatch;

pub use api::api_routes;
pub use common::common_routes;
pub use dispatch::{route, Resource};

use crate::state::AppState;
use axum::Router;

/// Full local host: resource routes and `/version`.
pub fn app(state: AppState, max_body_bytes: usize) -> Router {
    api_routes(state, max_body_bytes).merge(common_routes())
}
