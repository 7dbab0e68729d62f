use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use log::warn;

use opsboard_corelib::{
    constants::ContentType,
    err::ErrResp,
    http::{Json, Query},
};

use super::{super::super::State as AppState, request, response};
use crate::libs::mundosms::{self, CallsRelay};

const MODE_DAY: &'static str = "day";
const MODE_NIGHT: &'static str = "night";

/// `GET /{base}/api/v1/calls/list?{filters}`
///
/// Filters are forwarded as they are. The upstream status and body are relayed.
pub async fn get_call_list(
    State(state): State<AppState>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Response, ErrResp> {
    let token = match state.mundosms.token.as_ref() {
        None => {
            let e = "missing PROVIDER_API_TOKEN".to_string();
            return Err(ErrResp::ErrConfig(Some(e)));
        }
        Some(token) => token,
    };
    let result = mundosms::list_calls(
        &state.client,
        state.mundosms.base.as_str(),
        token.as_str(),
        query.as_slice(),
    )
    .await;
    let relay = match result {
        Err(e) => {
            state.mundosms_status.set_error();
            return Err(e);
        }
        Ok(relay) => relay,
    };
    let status = match &relay {
        CallsRelay::Json(status, _) | CallsRelay::Text(status, _) => *status,
    };
    match status.is_success() {
        false => state.mundosms_status.set_error(),
        true => state.mundosms_status.set_ok(),
    }
    match relay {
        CallsRelay::Json(status, body) => Ok((status, Json(body)).into_response()),
        CallsRelay::Text(status, body) => {
            Ok((status, [(header::CONTENT_TYPE, ContentType::TEXT)], body).into_response())
        }
    }
}

/// `POST /{base}/api/v1/calls/flow?mode&pbx`
///
/// Responds 200 when all PBXs are switched, or 207 with the per-PBX results otherwise.
pub async fn post_flow(
    State(state): State<AppState>,
    Query(query): Query<request::PostFlowQuery>,
) -> impl IntoResponse {
    const FN_NAME: &'static str = "post_flow";

    let mode = match query.mode.as_deref() {
        Some(MODE_DAY) => MODE_DAY,
        Some(MODE_NIGHT) => MODE_NIGHT,
        _ => {
            return flow_error(StatusCode::BAD_REQUEST, "Use mode=day|night");
        }
    };
    let pbx_ids = match query.pbx.as_deref().map(|v| v.trim()) {
        None | Some("") => state.mundosms.pbx_ids.clone(),
        Some(pbx) => vec![pbx.to_string()],
    };
    let conf = &state.mundosms;
    let (provider_base, token, flow_day, flow_night) = match (
        conf.provider_base.as_ref(),
        conf.token.as_ref(),
        conf.flow_day.as_ref(),
        conf.flow_night.as_ref(),
    ) {
        (Some(base), Some(token), Some(day), Some(night)) if !pbx_ids.is_empty() => {
            (base, token, day, night)
        }
        _ => {
            let e = "missing PBX_IDS, FLOW_ID_DAY, FLOW_ID_NIGHT, PROVIDER_API_BASE or PROVIDER_API_TOKEN";
            warn!("[{}] {}", FN_NAME, e);
            return flow_error(StatusCode::INTERNAL_SERVER_ERROR, e);
        }
    };
    let flow_id = match mode {
        MODE_DAY => flow_day,
        _ => flow_night,
    };

    let results = mundosms::assign_flows(
        &state.client,
        provider_base.as_str(),
        token.as_str(),
        pbx_ids.as_slice(),
        flow_id.as_str(),
    )
    .await;
    let ok = results.iter().all(|r| r.success);
    if !ok {
        for r in results.iter().filter(|r| !r.success) {
            warn!(
                "[{}] assign flow {} to PBX {} error: {}",
                FN_NAME,
                flow_id,
                r.pbx_id,
                r.error.as_deref().unwrap_or("")
            );
        }
    }
    let status = match ok {
        false => StatusCode::MULTI_STATUS,
        true => StatusCode::OK,
    };
    (
        status,
        Json(response::PostFlow {
            ok,
            mode: mode.to_string(),
            flow_id: flow_id.clone(),
            results,
        }),
    )
        .into_response()
}

fn flow_error(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(response::PostFlowErr {
            ok: false,
            error: error.to_string(),
        }),
    )
        .into_response()
}
