use axum::{extract::State, response::IntoResponse};

use opsboard_corelib::http::Json;

use super::{super::super::State as AppState, response};

/// `GET /{base}/api/v1/status`
///
/// The last known status of each upstream API.
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(response::GetStatus {
        data: response::GetStatusData {
            gasoges: state.gasoges_status.get(),
            mundosms: state.mundosms_status.get(),
        },
    })
}
