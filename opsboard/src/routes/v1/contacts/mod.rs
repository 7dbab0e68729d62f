use axum::{Router, routing};

use super::super::State;

mod api;

pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new().nest(
        scope_path,
        Router::new()
            .route("/export", routing::get(api::get_export))
            .route("/phonebook.xml", routing::get(api::get_phonebook))
            .with_state(state.clone()),
    )
}
