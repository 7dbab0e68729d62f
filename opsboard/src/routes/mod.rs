use std::{collections::HashMap, error::Error as StdError, sync::Arc, time::Duration};

use axum::{Router, http::StatusCode, response::IntoResponse};
use chrono::{FixedOffset, Local, NaiveDateTime, Offset, Utc};
use reqwest;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, normalize_path::NormalizePathLayer, timeout::TimeoutLayer};

use opsboard_corelib::{
    err::ErrResp,
    http::{Json, Query},
};

use crate::libs::{
    config::{self, Config},
    contacts::{ContactStore, FirestoreOpts, FirestoreStore},
    gasoges::{self, GasogesOpts},
    kpi::{self, CallsKpis, CallsPolicy, DepotThresholds},
    mundosms,
    normalize::{self, DepotState},
    poller::{ApiStatus, Poller},
};

pub mod middleware;
mod v1;

/// The resources used by this service.
#[derive(Clone)]
pub struct State {
    /// The scope root path for the service.
    ///
    /// For example `/dashboard`, the APIs are
    /// - `http://host:port/dashboard/api/v1/gasoil/xxx`
    /// - `http://host:port/dashboard/api/v1/calls/xxx`
    pub scope_path: &'static str,
    /// The client for upstream HTTP requests.
    pub client: reqwest::Client,
    /// Gasoges API information. `None` when credentials are not configured.
    pub gasoges: Option<GasogesOpts>,
    /// MundoSMS API information.
    pub mundosms: MundoSmsState,
    /// Phonebook sources.
    pub contacts: ContactsState,
    pub calls_policy: CallsPolicy,
    pub thresholds: DepotThresholds,
    /// Stock estimation settings. Keys are depot IDs.
    pub depots: DepotSettings,
    /// The time zone of the PBX call timestamps and of the dashboard "today".
    pub tz: FixedOffset,
    /// Accepted Bearer tokens. Empty disables access control.
    pub access_tokens: Arc<Vec<String>>,
    pub calls_poller: Option<Arc<Poller<CallsKpis>>>,
    pub depots_poller: Option<Arc<Poller<Vec<DepotState>>>>,
    pub gasoges_status: ApiStatus,
    pub mundosms_status: ApiStatus,
}

#[derive(Clone)]
pub struct MundoSmsState {
    pub base: String,
    pub token: Option<String>,
    pub provider_base: Option<String>,
    pub pbx_ids: Vec<String>,
    pub flow_day: Option<String>,
    pub flow_night: Option<String>,
}

#[derive(Clone)]
pub struct ContactsState {
    /// `None` generates phonebooks without contacts.
    pub store: Option<Arc<dyn ContactStore>>,
    /// Static phonebook file for download.
    pub xml_file: String,
}

#[derive(Clone, Default)]
pub struct DepotSettings {
    pub capacities: HashMap<String, f64>,
    pub initial_stock: HashMap<String, f64>,
    pub inputs: HashMap<String, f64>,
}

/// Query parameters for `GET /version`
#[derive(Deserialize)]
pub struct GetVersionQuery {
    q: Option<String>,
}

#[derive(Serialize)]
struct GetVersionRes<'a> {
    data: GetVersionResData<'a>,
}

#[derive(Serialize)]
struct GetVersionResData<'a> {
    name: &'a str,
    version: &'a str,
}

const SERV_NAME: &'static str = env!("CARGO_PKG_NAME");
const SERV_VER: &'static str = env!("CARGO_PKG_VERSION");

impl State {
    /// The current time in the dashboard time zone without the offset.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }
}

impl DepotSettings {
    pub fn capacity(&self, id: i64) -> Option<f64> {
        self.capacities.get(id.to_string().as_str()).copied()
    }
}

/// To create resources for the service. Must be called inside a tokio runtime because pollers are
/// started here.
///
/// `store` overrides the Firestore contact store.
pub async fn new_state(
    scope_path: &'static str,
    conf: &Config,
    store: Option<Arc<dyn ContactStore>>,
) -> Result<State, Box<dyn StdError>> {
    let conf = config::apply_default(conf);
    let def_gasoges = config::Gasoges::default();
    let def_mundosms = config::MundoSms::default();
    let def_contacts = config::Contacts::default();
    let def_kpi = config::Kpi::default();
    let def_depots = config::Depots::default();
    let gasoges_conf = conf.gasoges.as_ref().unwrap_or(&def_gasoges);
    let mundosms_conf = conf.mundosms.as_ref().unwrap_or(&def_mundosms);
    let contacts_conf = conf.contacts.as_ref().unwrap_or(&def_contacts);
    let kpi_conf = conf.kpi.as_ref().unwrap_or(&def_kpi);
    let depots_conf = conf.depots.as_ref().unwrap_or(&def_depots);

    let client = reqwest::Client::new();
    let gasoges = match (
        gasoges_conf.username.as_ref(),
        gasoges_conf.password.as_ref(),
    ) {
        (Some(username), Some(password)) => Some(GasogesOpts {
            base: gasoges_conf
                .base
                .clone()
                .unwrap_or(config::DEF_GASOGES_BASE.to_string()),
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };
    let mundosms = MundoSmsState {
        base: mundosms_conf
            .base
            .clone()
            .unwrap_or(config::DEF_MUNDOSMS_BASE.to_string()),
        token: mundosms_conf.token.clone(),
        provider_base: mundosms_conf.provider_base.clone(),
        pbx_ids: mundosms_conf.pbx_ids.clone().unwrap_or_default(),
        flow_day: mundosms_conf.flow_day.clone(),
        flow_night: mundosms_conf.flow_night.clone(),
    };
    let tz = match mundosms_conf.tz_offset_minutes {
        None => Local::now().offset().fix(),
        Some(minutes) => match FixedOffset::east_opt(minutes * 60) {
            None => return Err(format!("invalid time zone offset {} minutes", minutes).into()),
            Some(tz) => tz,
        },
    };
    let store = match store {
        Some(store) => Some(store),
        None => match contacts_conf.firestore_project.as_ref() {
            None => None,
            Some(project) => {
                let store: Arc<dyn ContactStore> = Arc::new(FirestoreStore::new(
                    client.clone(),
                    FirestoreOpts {
                        base: contacts_conf
                            .firestore_base
                            .clone()
                            .unwrap_or(config::DEF_FIRESTORE_BASE.to_string()),
                        project: project.clone(),
                        api_key: contacts_conf.api_key.clone(),
                        collection: contacts_conf
                            .collection
                            .clone()
                            .unwrap_or(config::DEF_CONTACTS_COLLECTION.to_string()),
                    },
                ));
                Some(store)
            }
        },
    };
    let contacts = ContactsState {
        store,
        xml_file: contacts_conf
            .xml_file
            .clone()
            .unwrap_or(config::DEF_XML_FILE.to_string()),
    };
    let calls_policy = CallsPolicy {
        window_seconds: kpi_conf.window_seconds.unwrap_or(config::DEF_WINDOW_SECONDS) as i64,
        agent_active_minutes: kpi_conf
            .agent_active_minutes
            .unwrap_or(config::DEF_AGENT_ACTIVE_MINUTES) as i64,
    };
    let thresholds = DepotThresholds {
        low: kpi_conf.low_threshold.unwrap_or(config::DEF_LOW_THRESHOLD),
        critical: kpi_conf
            .critical_threshold
            .unwrap_or(config::DEF_CRITICAL_THRESHOLD),
    };
    let depots = DepotSettings {
        capacities: depots_conf.capacities.clone().unwrap_or_default(),
        initial_stock: depots_conf.initial_stock.clone().unwrap_or_default(),
        inputs: depots_conf.inputs.clone().unwrap_or_default(),
    };

    let gasoges_status = ApiStatus::default();
    let mundosms_status = ApiStatus::default();
    let calls_poller = match mundosms.token.as_ref() {
        None => None,
        Some(token) => {
            let interval = kpi_conf
                .calls_refetch_ms
                .unwrap_or(config::DEF_CALLS_REFETCH_MS);
            Some(Arc::new(new_calls_poller(
                client.clone(),
                mundosms.base.clone(),
                token.clone(),
                tz,
                calls_policy,
                Duration::from_millis(interval),
                mundosms_status.clone(),
            )))
        }
    };
    let depots_poller = match gasoges.as_ref() {
        None => None,
        Some(opts) => {
            let interval = kpi_conf
                .depots_refetch_ms
                .unwrap_or(config::DEF_DEPOTS_REFETCH_MS);
            Some(Arc::new(new_depots_poller(
                client.clone(),
                opts.clone(),
                depots.clone(),
                tz,
                Duration::from_millis(interval),
                gasoges_status.clone(),
            )))
        }
    };

    let state = State {
        scope_path,
        client,
        gasoges,
        mundosms,
        contacts,
        calls_policy,
        thresholds,
        depots,
        tz,
        access_tokens: Arc::new(conf.access_tokens.clone().unwrap_or_default()),
        calls_poller,
        depots_poller,
        gasoges_status,
        mundosms_status,
    };
    Ok(state)
}

/// To register service URIs in the specified root path.
pub fn new_service(state: &State) -> Router {
    Router::new().nest(
        &state.scope_path,
        Router::new()
            .merge(v1::gasoil::new_service("/api/v1/gasoil", state))
            .merge(v1::calls::new_service("/api/v1/calls", state))
            .merge(v1::contacts::new_service("/api/v1/contacts", state))
            .merge(v1::kpi::new_service("/api/v1/kpi", state))
            .merge(v1::status::new_service("/api/v1/status", state))
            .layer(middleware::AccessService::new(state.access_tokens.clone())),
    )
}

/// To apply the request timeout (408), permissive CORS and trailing slash trimming.
pub fn with_server_layers(router: Router, timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(CorsLayer::permissive())
        .layer(NormalizePathLayer::trim_trailing_slash())
}

pub async fn get_version(Query(query): Query<GetVersionQuery>) -> impl IntoResponse {
    if let Some(q) = query.q.as_ref() {
        match q.as_str() {
            "name" => return SERV_NAME.into_response(),
            "version" => return SERV_VER.into_response(),
            _ => (),
        }
    }

    Json(GetVersionRes {
        data: GetVersionResData {
            name: SERV_NAME,
            version: SERV_VER,
        },
    })
    .into_response()
}

fn new_calls_poller(
    client: reqwest::Client,
    base: String,
    token: String,
    tz: FixedOffset,
    policy: CallsPolicy,
    interval: Duration,
    status: ApiStatus,
) -> Poller<CallsKpis> {
    let query: Vec<(String, String)> = mundosms::KPI_CALLS_QUERY
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Poller::new(
        "calls",
        CallsKpis::default(),
        interval,
        status,
        move || {
            let client = client.clone();
            let base = base.clone();
            let token = token.clone();
            let query = query.clone();
            async move {
                let body = mundosms::get_calls(&client, &base, &token, &query).await?;
                let now = Utc::now().with_timezone(&tz).naive_local();
                Ok::<CallsKpis, ErrResp>(kpi::calls_kpis(
                    &normalize::calls(body),
                    now,
                    &policy,
                ))
            }
        },
    )
}

fn new_depots_poller(
    client: reqwest::Client,
    opts: GasogesOpts,
    depots: DepotSettings,
    tz: FixedOffset,
    interval: Duration,
    status: ApiStatus,
) -> Poller<Vec<DepotState>> {
    Poller::new("depots", vec![], interval, status, move || {
        let client = client.clone();
        let opts = opts.clone();
        let depots = depots.clone();
        async move {
            let today = Utc::now().with_timezone(&tz).date_naive();
            let states = gasoges::get_depot_states(&client, &opts, &today).await?;
            Ok::<Vec<DepotState>, ErrResp>(
                states
                    .into_iter()
                    .map(|s| {
                        let capacity = depots.capacity(s.id);
                        s.with_capacity(capacity)
                    })
                    .collect(),
            )
        }
    })
}
