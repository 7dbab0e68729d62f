//! Wrapper APIs for the Gasoges fuel telemetry API.
//!
//! All requests use HTTP Basic authentication. Path parameters are percent-encoded.

use chrono::NaiveDate;
use log::warn;
use reqwest::{Client, Method};
use serde_json::Value;

use opsboard_corelib::{err::ErrResp, strings};

use super::normalize::{self, DepotState};

/// Gasoges API information.
#[derive(Clone)]
pub struct GasogesOpts {
    /// API base path with host. For example `https://api.gasoges.es/v1`.
    pub base: String,
    pub username: String,
    pub password: String,
}

/// `GET /depositos`
pub async fn get_depots(client: &Client, opts: &GasogesOpts) -> Result<Value, ErrResp> {
    get_json(client, opts, &["depositos"]).await
}

/// `GET /depositos/nivel/{id}/{date}`
pub async fn get_depot_level(
    client: &Client,
    opts: &GasogesOpts,
    id: &str,
    date: &str,
) -> Result<Value, ErrResp> {
    get_json(client, opts, &["depositos", "nivel", id, date]).await
}

/// `GET /suministros/todos/{start}/{end}`
pub async fn get_supplies(
    client: &Client,
    opts: &GasogesOpts,
    start: &str,
    end: &str,
) -> Result<Value, ErrResp> {
    get_json(client, opts, &["suministros", "todos", start, end]).await
}

/// `GET /suministros/deposito/{id}/{start}/{end}`
pub async fn get_depot_supplies(
    client: &Client,
    opts: &GasogesOpts,
    id: &str,
    start: &str,
    end: &str,
) -> Result<Value, ErrResp> {
    get_json(client, opts, &["suministros", "deposito", id, start, end]).await
}

/// To build depot states of the date from the depot list and one level request per depot.
///
/// A failed level request leaves the level of that depot unknown and does not affect the others.
pub async fn get_depot_states(
    client: &Client,
    opts: &GasogesOpts,
    date: &NaiveDate,
) -> Result<Vec<DepotState>, ErrResp> {
    const FN_NAME: &'static str = "get_depot_states";

    let date = strings::ymd(date);
    let mut states = normalize::depots(get_depots(client, opts).await?);
    for state in states.iter_mut() {
        if state.level.is_some() {
            continue;
        }
        let id = state.id.to_string();
        match get_depot_level(client, opts, id.as_str(), date.as_str()).await {
            Err(e) => warn!("[{}] get level of depot {} error: {}", FN_NAME, id, e),
            Ok(level) => state.level = normalize::depot_level(&level),
        }
    }
    Ok(states)
}

async fn get_json(client: &Client, opts: &GasogesOpts, paths: &[&str]) -> Result<Value, ErrResp> {
    let url = match strings::url_with_segments(opts.base.as_str(), paths) {
        Err(e) => return Err(ErrResp::ErrConfig(Some(e))),
        Ok(url) => url,
    };
    let req = match client
        .request(Method::GET, url)
        .basic_auth(opts.username.as_str(), Some(opts.password.as_str()))
        .build()
    {
        Err(e) => {
            let e = format!("generate Gasoges request error: {}", e);
            return Err(ErrResp::ErrIntMsg(Some(e)));
        }
        Ok(req) => req,
    };
    let resp = match client.execute(req).await {
        Err(e) => {
            let e = format!("execute Gasoges request error: {}", e);
            return Err(ErrResp::ErrIntMsg(Some(e)));
        }
        Ok(resp) => resp,
    };
    let status = resp.status();
    if !status.is_success() {
        let e = format!("Gasoges API error: {}", status.as_u16());
        return Err(ErrResp::ErrUpstream(status.as_u16(), Some(e)));
    }
    match resp.json::<Value>().await {
        Err(e) => {
            let e = format!("read Gasoges body error: {}", e);
            Err(ErrResp::ErrIntMsg(Some(e)))
        }
        Ok(body) => Ok(body),
    }
}
