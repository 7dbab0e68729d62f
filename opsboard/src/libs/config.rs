//! Program configurations.

use std::{collections::HashMap, env};

use clap::{Arg, ArgMatches, Command, builder::RangedU64ValueParser};
use serde::Deserialize;

/// Configuration file object.
#[derive(Default, Deserialize)]
pub struct Config {
    /// Gasoges fuel telemetry API.
    pub gasoges: Option<Gasoges>,
    /// MundoSMS PBX API.
    pub mundosms: Option<MundoSms>,
    /// Phonebook sources.
    pub contacts: Option<Contacts>,
    /// KPI policies and polling intervals.
    pub kpi: Option<Kpi>,
    /// Per-depot stock settings. Keys are depot IDs.
    pub depots: Option<Depots>,
    /// Bearer tokens accepted by dashboard APIs. None or empty disables access control.
    #[serde(rename = "accessTokens")]
    pub access_tokens: Option<Vec<String>>,
}

/// Gasoges API configurations. All fields are required to call the API.
#[derive(Default, Deserialize)]
pub struct Gasoges {
    /// API base path with host. Default is `https://api.gasoges.es/v1`.
    pub base: Option<String>,
    /// HTTP Basic user name.
    pub username: Option<String>,
    /// HTTP Basic password.
    pub password: Option<String>,
}

/// MundoSMS API configurations.
#[derive(Default, Deserialize)]
pub struct MundoSms {
    /// Call list API base. Default is `https://api.mundosms.es/APIV3`.
    pub base: Option<String>,
    /// Bearer token for both the call list and the flow APIs.
    pub token: Option<String>,
    /// PBX provisioning API base for flow assignments.
    #[serde(rename = "providerBase")]
    pub provider_base: Option<String>,
    /// PBX identifiers to switch when no single PBX is requested.
    #[serde(rename = "pbxIds")]
    pub pbx_ids: Option<Vec<String>>,
    /// Flow ID for `mode=day`.
    #[serde(rename = "flowDay")]
    pub flow_day: Option<String>,
    /// Flow ID for `mode=night`.
    #[serde(rename = "flowNight")]
    pub flow_night: Option<String>,
    /// UTC offset in minutes of the PBX call timestamps. Default is the host local offset.
    #[serde(rename = "tzOffsetMinutes")]
    pub tz_offset_minutes: Option<i32>,
}

/// Phonebook configurations.
#[derive(Default, Deserialize)]
pub struct Contacts {
    /// Firestore REST API base. Default is `https://firestore.googleapis.com/v1`.
    #[serde(rename = "firestoreBase")]
    pub firestore_base: Option<String>,
    /// Firestore project ID. Missing this to generate a phonebook without contacts.
    #[serde(rename = "firestoreProject")]
    pub firestore_project: Option<String>,
    /// Web API key for the Firestore REST API.
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    /// Contacts collection path. Default is `artifacts/default-app-id/public/data/contacts`.
    pub collection: Option<String>,
    /// Static phonebook file for download. Default is `public/phonebookEUROSURlogos2.xml`.
    #[serde(rename = "xmlFile")]
    pub xml_file: Option<String>,
}

/// KPI configurations.
#[derive(Default, Deserialize)]
pub struct Kpi {
    /// Calls started within this window without answer are waiting. Default is **60**, at most
    /// **86400**.
    #[serde(rename = "windowSeconds")]
    pub window_seconds: Option<u64>,
    /// Agents answered within this window are online. Default is **10**, at most **1440**.
    #[serde(rename = "agentActiveMinutes")]
    pub agent_active_minutes: Option<u64>,
    /// Depots below this level in liters are low. Default is **400**.
    #[serde(rename = "lowThreshold")]
    pub low_threshold: Option<f64>,
    /// Low depots below this level in liters are critical. Default is **200**.
    #[serde(rename = "criticalThreshold")]
    pub critical_threshold: Option<f64>,
    /// Calls KPI polling interval. Default is **5000**.
    #[serde(rename = "callsRefetchMs")]
    pub calls_refetch_ms: Option<u64>,
    /// Depot states polling interval. Default is **300000**.
    #[serde(rename = "depotsRefetchMs")]
    pub depots_refetch_ms: Option<u64>,
}

/// Stock estimation settings.
#[derive(Clone, Default, Deserialize)]
pub struct Depots {
    /// Tank capacity in liters.
    pub capacities: Option<HashMap<String, f64>>,
    /// Stock in liters at the start of the estimation period.
    #[serde(rename = "initialStock")]
    pub initial_stock: Option<HashMap<String, f64>>,
    /// Refills in liters during the estimation period.
    pub inputs: Option<HashMap<String, f64>>,
}

pub const DEF_GASOGES_BASE: &'static str = "https://api.gasoges.es/v1";
pub const DEF_MUNDOSMS_BASE: &'static str = "https://api.mundosms.es/APIV3";
pub const DEF_FIRESTORE_BASE: &'static str = "https://firestore.googleapis.com/v1";
pub const DEF_CONTACTS_COLLECTION: &'static str = "artifacts/default-app-id/public/data/contacts";
pub const DEF_XML_FILE: &'static str = "public/phonebookEUROSURlogos2.xml";
pub const DEF_WINDOW_SECONDS: u64 = 60;
pub const DEF_AGENT_ACTIVE_MINUTES: u64 = 10;
pub const MAX_WINDOW_SECONDS: u64 = 86400;
pub const MAX_AGENT_ACTIVE_MINUTES: u64 = 1440;
pub const DEF_LOW_THRESHOLD: f64 = 400.0;
pub const DEF_CRITICAL_THRESHOLD: f64 = 200.0;
pub const DEF_CALLS_REFETCH_MS: u64 = 5000;
pub const DEF_DEPOTS_REFETCH_MS: u64 = 300000;

/// To register Clap arguments.
pub fn reg_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("dashboard.gasoges.base")
            .long("dashboard.gasoges.base")
            .help("Gasoges API base (ex: https://api.gasoges.es/v1)")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.gasoges.username")
            .long("dashboard.gasoges.username")
            .help("Gasoges API user name")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.gasoges.password")
            .long("dashboard.gasoges.password")
            .help("Gasoges API password")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.mundosms.base")
            .long("dashboard.mundosms.base")
            .help("MundoSMS call list API base (ex: https://api.mundosms.es/APIV3)")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.mundosms.token")
            .long("dashboard.mundosms.token")
            .help("MundoSMS API token")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.mundosms.provider-base")
            .long("dashboard.mundosms.provider-base")
            .help("PBX provisioning API base")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.mundosms.pbx-ids")
            .long("dashboard.mundosms.pbx-ids")
            .help("comma separated PBX IDs")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.mundosms.flow-day")
            .long("dashboard.mundosms.flow-day")
            .help("flow ID for day mode")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.mundosms.flow-night")
            .long("dashboard.mundosms.flow-night")
            .help("flow ID for night mode")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.mundosms.tz-offset")
            .long("dashboard.mundosms.tz-offset")
            .help("UTC offset in minutes of PBX timestamps")
            .num_args(1)
            .allow_negative_numbers(true)
            .value_parser(clap::value_parser!(i32).range(-720..=840)),
    )
    .arg(
        Arg::new("dashboard.contacts.firestore-project")
            .long("dashboard.contacts.firestore-project")
            .help("Firestore project ID of the phonebook")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.contacts.api-key")
            .long("dashboard.contacts.api-key")
            .help("Firestore web API key")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.contacts.collection")
            .long("dashboard.contacts.collection")
            .help("Firestore contacts collection path")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.contacts.xml-file")
            .long("dashboard.contacts.xml-file")
            .help("static phonebook XML file")
            .num_args(1),
    )
    .arg(
        Arg::new("dashboard.kpi.window-seconds")
            .long("dashboard.kpi.window-seconds")
            .help("waiting calls window in seconds")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(1..=MAX_WINDOW_SECONDS)),
    )
    .arg(
        Arg::new("dashboard.kpi.agent-active-minutes")
            .long("dashboard.kpi.agent-active-minutes")
            .help("online agents window in minutes")
            .num_args(1)
            .value_parser(
                RangedU64ValueParser::<u64>::new().range(1..=MAX_AGENT_ACTIVE_MINUTES),
            ),
    )
    .arg(
        Arg::new("dashboard.kpi.calls-refetch-ms")
            .long("dashboard.kpi.calls-refetch-ms")
            .help("calls KPI polling interval in milliseconds")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(100..)),
    )
    .arg(
        Arg::new("dashboard.kpi.depots-refetch-ms")
            .long("dashboard.kpi.depots-refetch-ms")
            .help("depot states polling interval in milliseconds")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(100..)),
    )
    .arg(
        Arg::new("dashboard.access-tokens")
            .long("dashboard.access-tokens")
            .help("comma separated Bearer tokens for dashboard APIs")
            .num_args(1),
    )
}

/// To read input arguments from command-line arguments and environment variables.
///
/// This function will call [`apply_default()`] to fill missing values so you do not need call it
/// again.
pub fn read_args(args: &ArgMatches) -> Config {
    apply_default(&Config {
        gasoges: Some(Gasoges {
            base: read_string(args, "dashboard.gasoges.base", "GASOGES_API_URL"),
            username: read_string(args, "dashboard.gasoges.username", "GASOGES_API_USER"),
            password: read_string(args, "dashboard.gasoges.password", "GASOGES_API_PASS"),
        }),
        mundosms: Some(MundoSms {
            base: read_string(args, "dashboard.mundosms.base", "MUNDOSMS_API_URL"),
            token: read_string(args, "dashboard.mundosms.token", "PROVIDER_API_TOKEN"),
            provider_base: read_string(
                args,
                "dashboard.mundosms.provider-base",
                "PROVIDER_API_BASE",
            ),
            pbx_ids: read_string(args, "dashboard.mundosms.pbx-ids", "PBX_IDS")
                .map(|v| split_list(v.as_str())),
            flow_day: read_string(args, "dashboard.mundosms.flow-day", "FLOW_ID_DAY"),
            flow_night: read_string(args, "dashboard.mundosms.flow-night", "FLOW_ID_NIGHT"),
            tz_offset_minutes: match args.try_get_one::<i32>("dashboard.mundosms.tz-offset") {
                Ok(Some(v)) => Some(*v),
                _ => match env::var("MUNDOSMS_TZ_OFFSET_MINUTES") {
                    Err(_) => None,
                    Ok(v) => v.parse::<i32>().ok(),
                },
            },
        }),
        contacts: Some(Contacts {
            firestore_base: env::var("CONTACTS_FIRESTORE_BASE").ok(),
            firestore_project: read_string(
                args,
                "dashboard.contacts.firestore-project",
                "CONTACTS_FIRESTORE_PROJECT",
            ),
            api_key: read_string(args, "dashboard.contacts.api-key", "CONTACTS_API_KEY"),
            collection: read_string(
                args,
                "dashboard.contacts.collection",
                "CONTACTS_COLLECTION",
            ),
            xml_file: read_string(args, "dashboard.contacts.xml-file", "CONTACTS_XML_FILE"),
        }),
        kpi: Some(Kpi {
            window_seconds: read_u64(args, "dashboard.kpi.window-seconds", "KPI_WINDOW_SECONDS"),
            agent_active_minutes: read_u64(
                args,
                "dashboard.kpi.agent-active-minutes",
                "KPI_AGENT_ACTIVE_MINUTES",
            ),
            low_threshold: match env::var("KPI_LOW_THRESHOLD") {
                Err(_) => None,
                Ok(v) => v.parse::<f64>().ok(),
            },
            critical_threshold: match env::var("KPI_CRITICAL_THRESHOLD") {
                Err(_) => None,
                Ok(v) => v.parse::<f64>().ok(),
            },
            calls_refetch_ms: read_u64(
                args,
                "dashboard.kpi.calls-refetch-ms",
                "KPI_CALLS_REFETCH_MS",
            ),
            depots_refetch_ms: read_u64(
                args,
                "dashboard.kpi.depots-refetch-ms",
                "KPI_DEPOTS_REFETCH_MS",
            ),
        }),
        depots: Some(Depots {
            capacities: read_depot_map("DEPOTS_CAPACITIES"),
            initial_stock: read_depot_map("DEPOTS_INITIAL_STOCK"),
            inputs: read_depot_map("DEPOTS_INPUTS"),
        }),
        access_tokens: read_string(args, "dashboard.access-tokens", "DASHBOARD_ACCESS_TOKENS")
            .map(|v| split_list(v.as_str())),
    })
}

/// Fill missing configuration with default values.
pub fn apply_default(config: &Config) -> Config {
    Config {
        gasoges: {
            let def = Gasoges::default();
            let conf = config.gasoges.as_ref().unwrap_or(&def);
            Some(Gasoges {
                base: Some(non_empty(&conf.base).unwrap_or(DEF_GASOGES_BASE.to_string())),
                username: non_empty(&conf.username),
                password: non_empty(&conf.password),
            })
        },
        mundosms: {
            let def = MundoSms::default();
            let conf = config.mundosms.as_ref().unwrap_or(&def);
            Some(MundoSms {
                base: Some(non_empty(&conf.base).unwrap_or(DEF_MUNDOSMS_BASE.to_string())),
                token: non_empty(&conf.token),
                provider_base: non_empty(&conf.provider_base),
                pbx_ids: Some(match conf.pbx_ids.as_ref() {
                    None => vec![],
                    Some(ids) => trim_list(ids),
                }),
                flow_day: non_empty(&conf.flow_day),
                flow_night: non_empty(&conf.flow_night),
                tz_offset_minutes: conf.tz_offset_minutes,
            })
        },
        contacts: {
            let def = Contacts::default();
            let conf = config.contacts.as_ref().unwrap_or(&def);
            Some(Contacts {
                firestore_base: Some(
                    non_empty(&conf.firestore_base).unwrap_or(DEF_FIRESTORE_BASE.to_string()),
                ),
                firestore_project: non_empty(&conf.firestore_project),
                api_key: non_empty(&conf.api_key),
                collection: Some(
                    non_empty(&conf.collection).unwrap_or(DEF_CONTACTS_COLLECTION.to_string()),
                ),
                xml_file: Some(non_empty(&conf.xml_file).unwrap_or(DEF_XML_FILE.to_string())),
            })
        },
        kpi: {
            let def = Kpi::default();
            let conf = config.kpi.as_ref().unwrap_or(&def);
            Some(Kpi {
                window_seconds: Some(
                    positive(conf.window_seconds, DEF_WINDOW_SECONDS).min(MAX_WINDOW_SECONDS),
                ),
                agent_active_minutes: Some(
                    positive(conf.agent_active_minutes, DEF_AGENT_ACTIVE_MINUTES)
                        .min(MAX_AGENT_ACTIVE_MINUTES),
                ),
                low_threshold: Some(match conf.low_threshold {
                    Some(v) if v.is_finite() => v,
                    _ => DEF_LOW_THRESHOLD,
                }),
                critical_threshold: Some(match conf.critical_threshold {
                    Some(v) if v.is_finite() => v,
                    _ => DEF_CRITICAL_THRESHOLD,
                }),
                calls_refetch_ms: Some(positive(conf.calls_refetch_ms, DEF_CALLS_REFETCH_MS)),
                depots_refetch_ms: Some(positive(conf.depots_refetch_ms, DEF_DEPOTS_REFETCH_MS)),
            })
        },
        depots: {
            let def = Depots::default();
            let conf = config.depots.as_ref().unwrap_or(&def);
            Some(Depots {
                capacities: Some(conf.capacities.clone().unwrap_or_default()),
                initial_stock: Some(conf.initial_stock.clone().unwrap_or_default()),
                inputs: Some(conf.inputs.clone().unwrap_or_default()),
            })
        },
        access_tokens: Some(match config.access_tokens.as_ref() {
            None => vec![],
            Some(tokens) => trim_list(tokens),
        }),
    }
}

/// Split a comma separated list and drop empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect()
}

fn trim_list(list: &Vec<String>) -> Vec<String> {
    list.iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    match value.as_ref() {
        Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn positive(value: Option<u64>, default: u64) -> u64 {
    match value {
        None | Some(0) => default,
        Some(v) => v,
    }
}

fn read_string(args: &ArgMatches, arg: &str, env_name: &str) -> Option<String> {
    match args.try_get_one::<String>(arg) {
        Ok(Some(v)) => Some(v.clone()),
        _ => env::var(env_name).ok(),
    }
}

fn read_u64(args: &ArgMatches, arg: &str, env_name: &str) -> Option<u64> {
    match args.try_get_one::<u64>(arg) {
        Ok(Some(v)) => Some(*v),
        _ => match env::var(env_name) {
            Err(_) => None,
            Ok(v) => v.parse::<u64>().ok(),
        },
    }
}

/// Depot maps are JSON objects such as `{"1":5000,"2":8000}`.
fn read_depot_map(env_name: &str) -> Option<HashMap<String, f64>> {
    match env::var(env_name) {
        Err(_) => None,
        Ok(v) => match v.len() {
            0 => None,
            _ => serde_json::from_str::<HashMap<String, f64>>(v.as_str()).ok(),
        },
    }
}
