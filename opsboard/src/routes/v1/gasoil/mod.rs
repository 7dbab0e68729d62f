use axum::{Router, routing};

use super::super::State;

mod api;
mod request;
mod response;

pub fn new_service(scope_path: &str, state: &State) -> Router {
    Router::new().nest(
        scope_path,
        Router::new()
            .route("/depot/list", routing::get(api::get_depot_list))
            .route(
                "/depot/level",
                routing::get(api::get_depot_level).post(api::post_depot_level),
            )
            .route("/depot/state", routing::get(api::get_depot_state))
            .route("/supply/list", routing::get(api::get_supply_list))
            .route("/supply/depot", routing::get(api::get_supply_depot))
            .with_state(state.clone()),
    )
}
