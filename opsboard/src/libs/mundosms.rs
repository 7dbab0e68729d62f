//! Wrapper APIs for the MundoSMS PBX API.
//!
//! All requests use the Bearer token.

use reqwest::{Client, Method, StatusCode, header};
use serde::Serialize;
use serde_json::Value;

use opsboard_corelib::{err::ErrResp, strings};

/// Relayed call list response. The status is the upstream one.
pub enum CallsRelay {
    Json(StatusCode, Value),
    Text(StatusCode, String),
}

/// Flow assignment result of one PBX.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlowResult {
    pub pbx_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
struct PostAssignBody<'a> {
    pbx_id: &'a str,
    flow_id: &'a str,
}

/// Query of the call list used for the calls KPI.
pub const KPI_CALLS_QUERY: [(&'static str, &'static str); 4] = [
    ("type", "in"),
    ("from_datetime", ""),
    ("from_id", ""),
    ("showall", "0"),
];

/// `GET {base}/list_voipcalls?{query}` and relay the status and the body as it is.
pub async fn list_calls(
    client: &Client,
    base: &str,
    token: &str,
    query: &[(String, String)],
) -> Result<CallsRelay, ErrResp> {
    let resp = request_calls(client, base, token, query).await?;
    let status = resp.status();
    let text = match resp.text().await {
        Err(e) => {
            let e = format!("read MundoSMS body error: {}", e);
            return Err(ErrResp::ErrIntMsg(Some(e)));
        }
        Ok(text) => text,
    };
    match serde_json::from_str::<Value>(text.as_str()) {
        Err(_) => Ok(CallsRelay::Text(status, text)),
        Ok(body) => Ok(CallsRelay::Json(status, body)),
    }
}

/// `GET {base}/list_voipcalls?{query}` and return the JSON body of a success response.
pub async fn get_calls(
    client: &Client,
    base: &str,
    token: &str,
    query: &[(String, String)],
) -> Result<Value, ErrResp> {
    let resp = request_calls(client, base, token, query).await?;
    let status = resp.status();
    if !status.is_success() {
        let e = format!("MundoSMS API error: {}", status.as_u16());
        return Err(ErrResp::ErrUpstream(status.as_u16(), Some(e)));
    }
    match resp.json::<Value>().await {
        Err(e) => {
            let e = format!("read MundoSMS body error: {}", e);
            Err(ErrResp::ErrIntMsg(Some(e)))
        }
        Ok(body) => Ok(body),
    }
}

/// To assign the flow to each PBX with `POST {provider_base}/pbx/flows/assign`.
///
/// Requests are sent one by one. The failure of one PBX does not stop the others.
pub async fn assign_flows(
    client: &Client,
    provider_base: &str,
    token: &str,
    pbx_ids: &[String],
    flow_id: &str,
) -> Vec<FlowResult> {
    let mut results = vec![];
    for pbx_id in pbx_ids {
        let result = assign_flow(client, provider_base, token, pbx_id.as_str(), flow_id).await;
        results.push(FlowResult {
            pbx_id: pbx_id.clone(),
            success: result.is_ok(),
            error: match result {
                Err(e) => Some(e.message().unwrap_or("unknown error").to_string()),
                Ok(_) => None,
            },
        });
    }
    results
}

async fn assign_flow(
    client: &Client,
    provider_base: &str,
    token: &str,
    pbx_id: &str,
    flow_id: &str,
) -> Result<(), ErrResp> {
    let url = match strings::url_with_segments(provider_base, &["pbx", "flows", "assign"]) {
        Err(e) => return Err(ErrResp::ErrConfig(Some(e))),
        Ok(url) => url,
    };
    let req = match client
        .request(Method::POST, url)
        .bearer_auth(token)
        .json(&PostAssignBody { pbx_id, flow_id })
        .build()
    {
        Err(e) => {
            let e = format!("generate assign request error: {}", e);
            return Err(ErrResp::ErrIntMsg(Some(e)));
        }
        Ok(req) => req,
    };
    match client.execute(req).await {
        Err(e) => {
            let e = format!("execute assign request error: {}", e);
            Err(ErrResp::ErrIntMsg(Some(e)))
        }
        Ok(resp) => match resp.status().is_success() {
            false => {
                let status = resp.status();
                Err(ErrResp::ErrUpstream(status.as_u16(), Some(status.to_string())))
            }
            true => Ok(()),
        },
    }
}

async fn request_calls(
    client: &Client,
    base: &str,
    token: &str,
    query: &[(String, String)],
) -> Result<reqwest::Response, ErrResp> {
    let mut url = match strings::url_with_segments(base, &["list_voipcalls"]) {
        Err(e) => return Err(ErrResp::ErrConfig(Some(e))),
        Ok(url) => url,
    };
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }
    let req = match client
        .request(Method::GET, url)
        .bearer_auth(token)
        .header(header::ACCEPT, "application/json")
        .build()
    {
        Err(e) => {
            let e = format!("generate MundoSMS request error: {}", e);
            return Err(ErrResp::ErrIntMsg(Some(e)));
        }
        Ok(req) => req,
    };
    match client.execute(req).await {
        Err(e) => {
            let e = format!("execute MundoSMS request error: {}", e);
            Err(ErrResp::ErrIntMsg(Some(e)))
        }
        Ok(resp) => Ok(resp),
    }
}
