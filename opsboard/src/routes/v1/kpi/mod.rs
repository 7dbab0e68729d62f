use axum::{Router, routing};

use super::super::State;

mod api;
mod request;
mod response;

pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new().nest(
        scope_path,
        Router::new()
            .route("/calls", routing::get(api::get_calls))
            .route("/depots", routing::get(api::get_depots))
            .route("/supplies", routing::get(api::get_supplies))
            .route("/depot/estimate", routing::get(api::get_depot_estimate))
            .with_state(state.clone()),
    )
}
