//! Mock upstream APIs and shared test helpers.

use std::{
    collections::HashMap,
    env,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing,
};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::{net::TcpListener, runtime::Runtime, task::JoinHandle};

use opsboard::{
    libs::config::{self, Config},
    routes,
};

use crate::TestState;

pub const SCOPE_PATH: &'static str = "/dashboard";
pub const GASOGES_USER: &'static str = "user";
pub const GASOGES_PASS: &'static str = "pass";
/// base64 of `user:pass`.
const GASOGES_BASIC: &'static str = "Basic dXNlcjpwYXNz";
pub const PROVIDER_TOKEN: &'static str = "provider-token";
pub const FLOW_DAY: &'static str = "flow-day";
pub const FLOW_NIGHT: &'static str = "flow-night";
pub const FAIL_PBX: &'static str = "pbx-fail";
pub const FIRESTORE_PROJECT: &'static str = "project";
pub const UNAVAILABLE_DATE: &'static str = "2000-01-01";

/// Request counters of the mock APIs.
#[derive(Default)]
pub struct Counters {
    pub depots: AtomicUsize,
    pub levels: AtomicUsize,
    pub supplies: AtomicUsize,
    pub calls: AtomicUsize,
    pub assigns: AtomicUsize,
    pub firestore: AtomicUsize,
}

/// Mock Gasoges, MundoSMS, PBX provider and Firestore APIs on an ephemeral port.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub counters: Arc<Counters>,
    /// `(pbx_id, flow_id)` of received assignments.
    pub assigns: Arc<Mutex<Vec<(String, String)>>>,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
struct MockState {
    counters: Arc<Counters>,
    assigns: Arc<Mutex<Vec<(String, String)>>>,
}

#[derive(Deserialize)]
struct AssignBody {
    pbx_id: String,
    flow_id: String,
}

#[derive(Deserialize)]
struct FirestoreQuery {
    #[serde(rename = "pageToken")]
    page_token: Option<String>,
}

impl MockUpstream {
    pub fn gasoges_base(&self) -> String {
        format!("http://{}/gasoges/v1", self.addr)
    }

    pub fn mundosms_base(&self) -> String {
        format!("http://{}/mundosms/APIV3", self.addr)
    }

    pub fn provider_base(&self) -> String {
        format!("http://{}/provider", self.addr)
    }

    pub fn firestore_base(&self) -> String {
        format!("http://{}/firestore/v1", self.addr)
    }

    pub fn count(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// To start the mock upstream server in the runtime.
pub fn start_upstream(runtime: &Runtime) -> MockUpstream {
    let counters = Arc::new(Counters::default());
    let assigns = Arc::new(Mutex::new(vec![]));
    let state = MockState {
        counters: counters.clone(),
        assigns: assigns.clone(),
    };
    let app = Router::new()
        .route("/gasoges/v1/depositos", routing::get(get_depots))
        .route(
            "/gasoges/v1/depositos/nivel/{id}/{date}",
            routing::get(get_level),
        )
        .route(
            "/gasoges/v1/suministros/todos/{start}/{end}",
            routing::get(get_supplies),
        )
        .route(
            "/gasoges/v1/suministros/deposito/{id}/{start}/{end}",
            routing::get(get_depot_supplies),
        )
        .route("/mundosms/APIV3/list_voipcalls", routing::get(get_calls))
        .route("/provider/pbx/flows/assign", routing::post(post_assign))
        .route(
            "/firestore/v1/projects/{project}/databases/{db}/documents/{*path}",
            routing::get(get_documents),
        )
        .with_state(state);

    let (addr, handle) = runtime.block_on(async move {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (addr, handle)
    });
    MockUpstream {
        addr,
        counters,
        assigns,
        handle,
    }
}

/// The configuration that uses all mock APIs.
pub fn mock_config(upstream: &MockUpstream) -> Config {
    Config {
        gasoges: Some(config::Gasoges {
            base: Some(upstream.gasoges_base()),
            username: Some(GASOGES_USER.to_string()),
            password: Some(GASOGES_PASS.to_string()),
        }),
        mundosms: Some(config::MundoSms {
            base: Some(upstream.mundosms_base()),
            token: Some(PROVIDER_TOKEN.to_string()),
            provider_base: Some(upstream.provider_base()),
            pbx_ids: Some(vec![
                "101".to_string(),
                FAIL_PBX.to_string(),
                "103".to_string(),
            ]),
            flow_day: Some(FLOW_DAY.to_string()),
            flow_night: Some(FLOW_NIGHT.to_string()),
            tz_offset_minutes: Some(0),
        }),
        contacts: Some(config::Contacts {
            firestore_base: Some(upstream.firestore_base()),
            firestore_project: Some(FIRESTORE_PROJECT.to_string()),
            api_key: Some("key".to_string()),
            collection: None,
            xml_file: Some(xml_file_path()),
        }),
        kpi: None,
        depots: Some(config::Depots {
            capacities: Some(HashMap::from([("3".to_string(), 2000.0)])),
            initial_stock: Some(HashMap::from([("3".to_string(), 1500.0)])),
            inputs: Some(HashMap::from([("3".to_string(), 100.0)])),
        }),
        access_tokens: None,
    }
}

/// The static phonebook file path for export tests.
pub fn xml_file_path() -> String {
    env::temp_dir()
        .join("opsboard-test-phonebook.xml")
        .to_string_lossy()
        .to_string()
}

/// To create the test state with the mock upstream, the routes state and the test server.
pub fn new_state(conf_fn: Option<fn(&MockUpstream) -> Config>) -> TestState {
    let runtime = Runtime::new().unwrap();
    let upstream = start_upstream(&runtime);
    let conf = match conf_fn {
        None => mock_config(&upstream),
        Some(conf_fn) => conf_fn(&upstream),
    };
    let routes_state = match runtime
        .block_on(async { routes::new_state(SCOPE_PATH, &conf, None).await })
    {
        Err(e) => panic!("create routes state error: {}", e),
        Ok(state) => state,
    };
    let server = match TestServer::new(routes::new_service(&routes_state)) {
        Err(e) => panic!("new server error: {}", e),
        Ok(server) => server,
    };
    TestState {
        runtime: Some(runtime),
        upstream: Some(upstream),
        routes_state: Some(routes_state),
        server: Some(server),
    }
}

fn is_basic(headers: &HeaderMap) -> bool {
    match headers.get(header::AUTHORIZATION) {
        None => false,
        Some(v) => v.as_bytes() == GASOGES_BASIC.as_bytes(),
    }
}

fn is_bearer(headers: &HeaderMap) -> bool {
    match headers.get(header::AUTHORIZATION) {
        None => false,
        Some(v) => v.as_bytes() == format!("Bearer {}", PROVIDER_TOKEN).as_bytes(),
    }
}

async fn get_depots(State(state): State<MockState>, headers: HeaderMap) -> Response {
    state.counters.depots.fetch_add(1, Ordering::SeqCst);
    if !is_basic(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([[2, "DEP-2"], [3, "DEP-3"]])).into_response()
}

async fn get_level(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path((id, _date)): Path<(String, String)>,
) -> Response {
    state.counters.levels.fetch_add(1, Ordering::SeqCst);
    if !is_basic(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match id.as_str() {
        "2" => Json(json!([[970]])).into_response(),
        "3" => (StatusCode::INTERNAL_SERVER_ERROR, "level error").into_response(),
        "4" => Json(json!([[null]])).into_response(),
        "404" => StatusCode::NOT_FOUND.into_response(),
        _ => Json(json!([["n/a"]])).into_response(),
    }
}

async fn get_supplies(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path((start, _end)): Path<(String, String)>,
) -> Response {
    state.counters.supplies.fetch_add(1, Ordering::SeqCst);
    if !is_basic(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if start.as_str() == UNAVAILABLE_DATE {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    Json(json!([
        [7, "1234ABC", 150200, 45.5, 1.459, format!("{} 08:15:00", start), "SN-01", 2, 1],
        [8, 990, "150300", "30,25", null, format!("{} 09:00:00", start), 5512, 3, 1],
        [9, "X", 1, "abc", 1.0, format!("{} 10:00:00", start), "SN-02", 2, 1]
    ]))
    .into_response()
}

async fn get_depot_supplies(
    State(state): State<MockState>,
    headers: HeaderMap,
    Path((id, start, _end)): Path<(String, String, String)>,
) -> Response {
    state.counters.supplies.fetch_add(1, Ordering::SeqCst);
    if !is_basic(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({"data": [
        {
            "ID_USUARIO": 7,
            "ID_VEHICULO": "1234ABC",
            "LITROS_SUMINISTRADOS": 100,
            "FECHA Y HORA": format!("{} 08:15:00", start),
            "ID_DEPOSITO": id
        },
        {
            "ID_USUARIO": 8,
            "ID_VEHICULO": "5678DEF",
            "LITROS_SUMINISTRADOS": "50,5",
            "FECHA Y HORA": format!("{} 12:30:00", start),
            "ID_DEPOSITO": id
        }
    ]}))
    .into_response()
}

/// Calls are generated relative to the current UTC time.
async fn get_calls(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    state.counters.calls.fetch_add(1, Ordering::SeqCst);
    if !is_bearer(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    for (k, v) in query.iter() {
        match (k.as_str(), v.as_str()) {
            ("format", "text") => return "call list as text".into_response(),
            ("fail", "1") => {
                return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "down"})))
                    .into_response();
            }
            _ => (),
        }
    }
    let now = Utc::now().naive_utc();
    let fmt = "%Y-%m-%d %H:%M:%S";
    let time = |secs: i64| (now - Duration::seconds(secs)).format(fmt).to_string();
    let query: Vec<Value> = query.iter().map(|(k, v)| json!([k, v])).collect();
    Json(json!({
        "query": query,
        "data": {"calls": [
            {"status": "0", "date_start": time(10), "date_answer": "", "date_end": ""},
            {
                "status": "1",
                "date_start": time(120),
                "date_answer": time(60),
                "date_end": "",
                "agent_id": "agent-1"
            },
            {
                "status": "1",
                "date_start": time(7200),
                "date_answer": time(7190),
                "date_end": time(7000),
                "callerid_text": "agent-2"
            }
        ]}
    }))
    .into_response()
}

async fn post_assign(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<AssignBody>,
) -> Response {
    state.counters.assigns.fetch_add(1, Ordering::SeqCst);
    if !is_bearer(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if let Ok(mut assigns) = state.assigns.lock() {
        assigns.push((body.pbx_id.clone(), body.flow_id.clone()));
    }
    match body.pbx_id.as_str() {
        FAIL_PBX => (StatusCode::NOT_FOUND, "unknown PBX").into_response(),
        _ => Json(json!({})).into_response(),
    }
}

async fn get_documents(
    State(state): State<MockState>,
    Path((project, db, path)): Path<(String, String, String)>,
    Query(query): Query<FirestoreQuery>,
) -> Response {
    state.counters.firestore.fetch_add(1, Ordering::SeqCst);
    if project.as_str() != FIRESTORE_PROJECT
        || db.as_str() != "(default)"
        || path.as_str() != config::DEF_CONTACTS_COLLECTION
    {
        return StatusCode::NOT_FOUND.into_response();
    }
    let prefix = format!(
        "projects/{}/databases/(default)/documents/{}",
        FIRESTORE_PROJECT,
        config::DEF_CONTACTS_COLLECTION
    );
    match query.page_token.as_deref() {
        None => Json(json!({
            "documents": [
                {
                    "name": format!("{}/abc123", prefix),
                    "fields": {
                        "firstName": {"stringValue": "Ana"},
                        "lastName": {"stringValue": "Ruiz & Co"},
                        "phone": {"stringValue": "600111222"}
                    }
                }
            ],
            "nextPageToken": "page2"
        }))
        .into_response(),
        Some("page2") => Json(json!({
            "documents": [
                {
                    "name": format!("{}/def456", prefix),
                    "fields": {
                        "firstName": {"stringValue": "Luis"},
                        "phone": {"integerValue": "600333444"}
                    }
                }
            ]
        }))
        .into_response(),
        Some(_) => Json(json!({})).into_response(),
    }
}
