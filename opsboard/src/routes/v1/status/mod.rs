use axum::{Router, routing};

use super::super::State;

mod api;
mod response;

pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new()
        .route(scope_path, routing::get(api::get_status))
        .with_state(state.clone())
}
