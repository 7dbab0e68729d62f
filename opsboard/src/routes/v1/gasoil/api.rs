use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde_json::Value;

use opsboard_corelib::{
    constants::CacheControl,
    err::ErrResp,
    http::{Json, Query},
    strings,
};

use super::{super::super::State as AppState, request, response};
use crate::libs::{
    gasoges::{self, GasogesOpts},
    normalize,
};

const FORMAT_RAW: &'static str = "raw";
const FORMAT_NORMALIZED: &'static str = "normalized";

/// `GET /{base}/api/v1/gasoil/depot/list`
pub async fn get_depot_list(State(state): State<AppState>) -> Result<Response, ErrResp> {
    let opts = gasoges_opts(&state)?;
    let result = gasoges::get_depots(&state.client, opts).await;
    state.gasoges_status.track(&result);
    Ok(([(header::CACHE_CONTROL, CacheControl::LONG)], Json(result?)).into_response())
}

/// `GET /{base}/api/v1/gasoil/depot/level?id&date`
pub async fn get_depot_level(
    State(state): State<AppState>,
    Query(query): Query<request::GetDepotLevelQuery>,
) -> Result<Response, ErrResp> {
    let id = required(query.id.as_deref(), "id")?;
    let date = required_date(query.date.as_deref(), "date")?;
    depot_level(&state, id, date).await
}

/// `POST /{base}/api/v1/gasoil/depot/level` with `{"id":...,"fecha":"YYYY-MM-DD"}`
pub async fn post_depot_level(
    State(state): State<AppState>,
    Json(body): Json<request::PostDepotLevelBody>,
) -> Result<Response, ErrResp> {
    let id = match body.id.as_ref() {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let id = required(Some(id.as_str()), "id")?;
    let date = required_date(body.fecha.as_deref(), "fecha")?;
    depot_level(&state, id, date).await
}

/// `GET /{base}/api/v1/gasoil/depot/state?date`
///
/// The date is today by default.
pub async fn get_depot_state(
    State(state): State<AppState>,
    Query(query): Query<request::GetDepotStateQuery>,
) -> Result<Response, ErrResp> {
    let date = match query.date.as_deref() {
        None | Some("") => Utc::now().with_timezone(&state.tz).date_naive(),
        Some(date) => match NaiveDate::parse_from_str(date, strings::DATE_FORMAT) {
            Ok(parsed) if strings::is_ymd(date) => parsed,
            _ => {
                let e = format!("`date` must be {}", strings::DATE_FORMAT);
                return Err(ErrResp::ErrParam(Some(e)));
            }
        },
    };
    let opts = gasoges_opts(&state)?;
    let result = gasoges::get_depot_states(&state.client, opts, &date).await;
    state.gasoges_status.track(&result);
    let data = result?
        .into_iter()
        .map(|s| {
            let capacity = state.depots.capacity(s.id);
            s.with_capacity(capacity)
        })
        .collect();
    Ok((
        [(header::CACHE_CONTROL, CacheControl::NO_CACHE)],
        Json(response::GetDepotState { data }),
    )
        .into_response())
}

/// `GET /{base}/api/v1/gasoil/supply/list?start&end&format`
pub async fn get_supply_list(
    State(state): State<AppState>,
    Query(query): Query<request::GetSupplyListQuery>,
) -> Result<Response, ErrResp> {
    let start = required_date(query.start.as_deref(), "start")?;
    let end = required_date(query.end.as_deref(), "end")?;
    let normalized = is_normalized(query.format.as_deref())?;
    let opts = gasoges_opts(&state)?;
    let result = gasoges::get_supplies(&state.client, opts, start, end).await;
    state.gasoges_status.track(&result);
    Ok(supplies_response(result?, normalized, CacheControl::SHORT))
}

/// `GET /{base}/api/v1/gasoil/supply/depot?id&start&end&format`
pub async fn get_supply_depot(
    State(state): State<AppState>,
    Query(query): Query<request::GetSupplyDepotQuery>,
) -> Result<Response, ErrResp> {
    let id = required(query.id.as_deref(), "id")?;
    let start = required_date(query.start.as_deref(), "start")?;
    let end = required_date(query.end.as_deref(), "end")?;
    let normalized = is_normalized(query.format.as_deref())?;
    let opts = gasoges_opts(&state)?;
    let result = gasoges::get_depot_supplies(&state.client, opts, id, start, end).await;
    state.gasoges_status.track(&result);
    Ok(supplies_response(result?, normalized, CacheControl::LONG))
}

async fn depot_level(state: &AppState, id: &str, date: &str) -> Result<Response, ErrResp> {
    let opts = gasoges_opts(state)?;
    let result = gasoges::get_depot_level(&state.client, opts, id, date).await;
    state.gasoges_status.track(&result);
    let level = normalize::depot_level(&result?);
    let id = match id.parse::<i64>() {
        Err(_) => Value::String(id.to_string()),
        Ok(id) => Value::from(id),
    };
    Ok((
        [(header::CACHE_CONTROL, CacheControl::NO_CACHE)],
        Json(response::GetDepotLevel {
            data: response::GetDepotLevelData { id, level },
        }),
    )
        .into_response())
}

fn supplies_response(body: Value, normalized: bool, cache: &'static str) -> Response {
    match normalized {
        false => ([(header::CACHE_CONTROL, cache)], Json(body)).into_response(),
        true => (
            [(header::CACHE_CONTROL, cache)],
            Json(response::GetSupplies {
                data: normalize::supplies(body),
            }),
        )
            .into_response(),
    }
}

fn gasoges_opts(state: &AppState) -> Result<&GasogesOpts, ErrResp> {
    match state.gasoges.as_ref() {
        None => Err(ErrResp::ErrConfig(Some(
            "missing Gasoges credentials".to_string(),
        ))),
        Some(opts) => Ok(opts),
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ErrResp> {
    match value.map(|v| v.trim()) {
        None | Some("") => Err(ErrResp::ErrParam(Some(format!("missing `{}`", name)))),
        Some(value) => Ok(value),
    }
}

fn required_date<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ErrResp> {
    let value = required(value, name)?;
    match strings::is_ymd(value) {
        false => Err(ErrResp::ErrParam(Some(format!(
            "`{}` must be {}",
            name,
            strings::DATE_FORMAT
        )))),
        true => Ok(value),
    }
}

fn is_normalized(format: Option<&str>) -> Result<bool, ErrResp> {
    match format {
        None | Some("") | Some(FORMAT_RAW) => Ok(false),
        Some(FORMAT_NORMALIZED) => Ok(true),
        Some(_) => Err(ErrResp::ErrParam(Some(format!(
            "`format` must be {} or {}",
            FORMAT_RAW, FORMAT_NORMALIZED
        )))),
    }
}
