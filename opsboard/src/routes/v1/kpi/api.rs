use axum::{extract::State, http::header, response::IntoResponse, response::Response};
use chrono::Utc;

use opsboard_corelib::{
    constants::CacheControl,
    err::ErrResp,
    http::{Json, Query},
    strings,
};

use super::{super::super::State as AppState, request, response};
use crate::libs::{
    gasoges,
    kpi::{self, DepotThresholds},
    normalize,
};

/// `GET /{base}/api/v1/kpi/calls`
pub async fn get_calls(State(state): State<AppState>) -> Result<Response, ErrResp> {
    let poller = match state.calls_poller.as_ref() {
        None => {
            let e = "missing PROVIDER_API_TOKEN".to_string();
            return Err(ErrResp::ErrConfig(Some(e)));
        }
        Some(poller) => poller,
    };
    let snapshot = poller.get().await;
    Ok((
        [(header::CACHE_CONTROL, CacheControl::NO_CACHE)],
        Json(response::GetCalls {
            data: response::GetCallsData {
                waiting_now: snapshot.value.waiting_now,
                answered_today: snapshot.value.answered_today,
                agents_online: snapshot.value.agents_online,
                updated_at: snapshot.updated_at.as_ref().map(strings::time_str),
            },
        }),
    )
        .into_response())
}

/// `GET /{base}/api/v1/kpi/depots?threshold&critical`
pub async fn get_depots(
    State(state): State<AppState>,
    Query(query): Query<request::GetDepotsQuery>,
) -> Result<Response, ErrResp> {
    let thresholds = DepotThresholds {
        low: match query.threshold {
            None => state.thresholds.low,
            Some(v) if v.is_finite() => v,
            Some(_) => {
                let e = "`threshold` must be a number".to_string();
                return Err(ErrResp::ErrParam(Some(e)));
            }
        },
        critical: match query.critical {
            None => state.thresholds.critical,
            Some(v) if v.is_finite() => v,
            Some(_) => {
                let e = "`critical` must be a number".to_string();
                return Err(ErrResp::ErrParam(Some(e)));
            }
        },
    };
    let poller = match state.depots_poller.as_ref() {
        None => {
            let e = "missing Gasoges credentials".to_string();
            return Err(ErrResp::ErrConfig(Some(e)));
        }
        Some(poller) => poller,
    };
    let snapshot = poller.get().await;
    Ok((
        [(header::CACHE_CONTROL, CacheControl::NO_CACHE)],
        Json(response::GetDepots {
            data: kpi::depot_alerts(&snapshot.value, &thresholds),
        }),
    )
        .into_response())
}

/// `GET /{base}/api/v1/kpi/supplies?date`
///
/// The date is today by default.
pub async fn get_supplies(
    State(state): State<AppState>,
    Query(query): Query<request::GetSuppliesQuery>,
) -> Result<Response, ErrResp> {
    let date = match query.date.as_deref() {
        None | Some("") => strings::ymd(&Utc::now().with_timezone(&state.tz).date_naive()),
        Some(date) => match strings::is_ymd(date) {
            false => {
                let e = format!("`date` must be {}", strings::DATE_FORMAT);
                return Err(ErrResp::ErrParam(Some(e)));
            }
            true => date.to_string(),
        },
    };
    let opts = match state.gasoges.as_ref() {
        None => {
            let e = "missing Gasoges credentials".to_string();
            return Err(ErrResp::ErrConfig(Some(e)));
        }
        Some(opts) => opts,
    };
    let result = gasoges::get_supplies(&state.client, opts, date.as_str(), date.as_str()).await;
    state.gasoges_status.track(&result);
    let supplies = normalize::supplies(result?);
    Ok((
        [(header::CACHE_CONTROL, CacheControl::SHORT)],
        Json(response::GetSupplies {
            data: kpi::supply_summary(supplies),
        }),
    )
        .into_response())
}

/// `GET /{base}/api/v1/kpi/depot/estimate?id&start&end`
///
/// Capacity, initial stock and refills come from configurations. Consumption is the sum of
/// supplies of the depot in the period.
pub async fn get_depot_estimate(
    State(state): State<AppState>,
    Query(query): Query<request::GetDepotEstimateQuery>,
) -> Result<Response, ErrResp> {
    let id = match query.id.as_deref().map(|v| v.trim()) {
        None | Some("") => return Err(ErrResp::ErrParam(Some("missing `id`".to_string()))),
        Some(id) => id,
    };
    let mut dates = vec![];
    for (name, value) in [("start", query.start.as_deref()), ("end", query.end.as_deref())] {
        match value {
            Some(v) if strings::is_ymd(v) => dates.push(v),
            _ => {
                let e = format!("`{}` must be {}", name, strings::DATE_FORMAT);
                return Err(ErrResp::ErrParam(Some(e)));
            }
        }
    }
    let opts = match state.gasoges.as_ref() {
        None => {
            let e = "missing Gasoges credentials".to_string();
            return Err(ErrResp::ErrConfig(Some(e)));
        }
        Some(opts) => opts,
    };
    let result =
        gasoges::get_depot_supplies(&state.client, opts, id, dates[0], dates[1]).await;
    state.gasoges_status.track(&result);
    let supplies = normalize::supplies(result?);
    let depots = &state.depots;
    let estimate = kpi::stock_estimate(
        depots.capacities.get(id).copied(),
        depots.initial_stock.get(id).copied(),
        depots.inputs.get(id).copied(),
        &supplies,
    );
    Ok((
        [(header::CACHE_CONTROL, CacheControl::NO_CACHE)],
        Json(response::GetDepotEstimate { data: estimate }),
    )
        .into_response())
}
