use axum::http::{StatusCode, header};
use laboratory::{SpecContext, expect};
use serde_json::{Value, json};

use opsboard::libs::config::{self, Config};

use super::{super::libs, STATE, header_str};
use crate::TestState;

const FLOW_SETTINGS_ERROR: &'static str =
    "missing PBX_IDS, FLOW_ID_DAY, FLOW_ID_NIGHT, PROVIDER_API_BASE or PROVIDER_API_TOKEN";

pub fn get_list(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let server = state.server.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    runtime.block_on(async {
        let resp = server
            .get("/dashboard/api/v1/calls/list")
            .add_query_param("type", "in")
            .add_query_param("showall", "0")
            .add_query_param("from_id", "")
            .await;
        expect(resp.status_code()).to_equal(StatusCode::OK)?;
        let body: Value = resp.json();
        expect(body["query"].clone())
            .to_equal(json!([["type", "in"], ["showall", "0"], ["from_id", ""]]))?;
        expect(body["data"]["calls"].as_array().map(|l| l.len())).to_equal(Some(3))?;
        expect(routes_state.mundosms_status.get()).to_equal("ok")?;

        let resp = server
            .get("/dashboard/api/v1/calls/list")
            .add_query_param("format", "text")
            .await;
        expect(resp.status_code()).to_equal(StatusCode::OK)?;
        expect(header_str(&resp, header::CONTENT_TYPE.as_str()).starts_with("text/plain"))
            .to_equal(true)?;
        expect(resp.text()).to_equal("call list as text".to_string())
    })
}

pub fn get_list_upstream(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let server = state.server.as_ref().unwrap();
    let routes_state = state.routes_state.as_ref().unwrap();

    runtime.block_on(async {
        let resp = server
            .get("/dashboard/api/v1/calls/list")
            .add_query_param("fail", "1")
            .await;
        expect(resp.status_code()).to_equal(StatusCode::SERVICE_UNAVAILABLE)?;
        let body: Value = resp.json();
        expect(body).to_equal(json!({"error": "down"}))?;
        expect(routes_state.mundosms_status.get()).to_equal("error")
    })
}

fn no_token_config(upstream: &libs::MockUpstream) -> Config {
    let conf = libs::mock_config(upstream);
    Config {
        mundosms: Some(config::MundoSms {
            token: None,
            base: Some(upstream.mundosms_base()),
            provider_base: Some(upstream.provider_base()),
            pbx_ids: Some(vec!["101".to_string(), "102".to_string()]),
            flow_day: Some(libs::FLOW_DAY.to_string()),
            flow_night: Some(libs::FLOW_NIGHT.to_string()),
            tz_offset_minutes: Some(0),
        }),
        ..conf
    }
}

pub fn get_list_no_token(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = libs::new_state(Some(no_token_config));
    let runtime = state.runtime.as_ref().unwrap();
    let server = state.server.as_ref().unwrap();
    let upstream = state.upstream.as_ref().unwrap();

    runtime.block_on(async {
        let resp = server.get("/dashboard/api/v1/calls/list").await;
        expect(resp.status_code()).to_equal(StatusCode::INTERNAL_SERVER_ERROR)?;
        let body: Value = resp.json();
        expect(body["code"].as_str()).to_equal(Some("err_config"))?;
        expect(body["error"].as_str()).to_equal(Some("missing PROVIDER_API_TOKEN"))?;
        expect(upstream.count(&upstream.counters.calls)).to_equal(0)
    })
}

pub fn post_flow(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let server = state.server.as_ref().unwrap();
    let upstream = state.upstream.as_ref().unwrap();

    runtime.block_on(async {
        let sent = upstream.assigns.lock().map(|a| a.len()).unwrap_or(0);
        let resp = server
            .post("/dashboard/api/v1/calls/flow")
            .add_query_param("mode", "day")
            .await;
        expect(resp.status_code()).to_equal(StatusCode::MULTI_STATUS)?;
        let body: Value = resp.json();
        expect(body.clone()).to_equal(json!({
            "ok": false,
            "mode": "day",
            "flow_id": libs::FLOW_DAY,
            "results": [
                {"pbx_id": "101", "success": true},
                {"pbx_id": libs::FAIL_PBX, "success": false, "error": "404 Not Found"},
                {"pbx_id": "103", "success": true}
            ]
        }))?;
        let failures = body["results"]
            .as_array()
            .map(|l| l.iter().filter(|r| r["success"] == json!(false)).count());
        expect(failures).to_equal(Some(1))?;

        let assigns = upstream.assigns.lock().unwrap().clone();
        expect(assigns.len() - sent).to_equal(3)?;
        expect(assigns[sent..].to_vec()).to_equal(vec![
            ("101".to_string(), libs::FLOW_DAY.to_string()),
            (libs::FAIL_PBX.to_string(), libs::FLOW_DAY.to_string()),
            ("103".to_string(), libs::FLOW_DAY.to_string()),
        ])
    })
}

pub fn post_flow_single(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let server = state.server.as_ref().unwrap();
    let upstream = state.upstream.as_ref().unwrap();

    runtime.block_on(async {
        let count = upstream.count(&upstream.counters.assigns);
        let resp = server
            .post("/dashboard/api/v1/calls/flow")
            .add_query_param("mode", "night")
            .add_query_param("pbx", "101")
            .await;
        expect(resp.status_code()).to_equal(StatusCode::OK)?;
        let body: Value = resp.json();
        expect(body).to_equal(json!({
            "ok": true,
            "mode": "night",
            "flow_id": libs::FLOW_NIGHT,
            "results": [{"pbx_id": "101", "success": true}]
        }))?;
        expect(upstream.count(&upstream.counters.assigns)).to_equal(count + 1)
    })
}

pub fn post_flow_invalid_mode(context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = context.state.borrow();
    let state = state.get(STATE).unwrap();
    let runtime = state.runtime.as_ref().unwrap();
    let server = state.server.as_ref().unwrap();
    let upstream = state.upstream.as_ref().unwrap();

    runtime.block_on(async {
        let count = upstream.count(&upstream.counters.assigns);
        for mode in [Some("evening"), Some("DAY"), Some(""), None] {
            let mut req = server.post("/dashboard/api/v1/calls/flow");
            if let Some(mode) = mode {
                req = req.add_query_param("mode", mode);
            }
            let resp = req.await;
            expect(resp.status_code()).to_equal(StatusCode::BAD_REQUEST)?;
            let body: Value = resp.json();
            expect(body).to_equal(json!({"ok": false, "error": "Use mode=day|night"}))?;
        }
        expect(upstream.count(&upstream.counters.assigns)).to_equal(count)
    })
}

fn no_pbx_config(upstream: &libs::MockUpstream) -> Config {
    let conf = no_token_config(upstream);
    Config {
        mundosms: Some(config::MundoSms {
            token: Some(libs::PROVIDER_TOKEN.to_string()),
            pbx_ids: None,
            ..conf.mundosms.unwrap_or_default()
        }),
        ..conf
    }
}

pub fn post_flow_no_settings(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let state = libs::new_state(Some(no_token_config));
    let runtime = state.runtime.as_ref().unwrap();
    let server = state.server.as_ref().unwrap();
    let upstream = state.upstream.as_ref().unwrap();

    runtime.block_on(async {
        let resp = server
            .post("/dashboard/api/v1/calls/flow")
            .add_query_param("mode", "day")
            .await;
        expect(resp.status_code()).to_equal(StatusCode::INTERNAL_SERVER_ERROR)?;
        let body: Value = resp.json();
        expect(body).to_equal(json!({"ok": false, "error": FLOW_SETTINGS_ERROR}))?;
        expect(upstream.count(&upstream.counters.assigns)).to_equal(0)
    })?;

    let state = libs::new_state(Some(no_pbx_config));
    let runtime = state.runtime.as_ref().unwrap();
    let server = state.server.as_ref().unwrap();
    let upstream = state.upstream.as_ref().unwrap();

    runtime.block_on(async {
        let resp = server
            .post("/dashboard/api/v1/calls/flow")
            .add_query_param("mode", "night")
            .await;
        expect(resp.status_code()).to_equal(StatusCode::INTERNAL_SERVER_ERROR)?;

        // A single PBX in the query needs no configured list.
        let resp = server
            .post("/dashboard/api/v1/calls/flow")
            .add_query_param("mode", "night")
            .add_query_param("pbx", "102")
            .await;
        expect(resp.status_code()).to_equal(StatusCode::OK)?;
        expect(upstream.count(&upstream.counters.assigns)).to_equal(1)
    })
}
