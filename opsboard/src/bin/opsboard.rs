use std::{
    error::Error as StdError,
    fs,
    net::{Ipv6Addr, SocketAddr, SocketAddrV6},
    time::Duration,
};

use axum::{Router, routing};
use axum_prometheus::PrometheusMetricLayer;
use axum_server::{self, tls_rustls::RustlsConfig};
use clap::{Arg as ClapArg, Command};
use futures::future;
use json5;
use log::{self, error, info};
use serde::Deserialize;
use tokio::{self, net::TcpListener};
use tower_http::services::ServeDir;

use opsboard::{libs, routes};
use opsboard_corelib::{
    logger::{self, LoggerLayer},
    server_config,
};

#[derive(Deserialize)]
struct AppConfig {
    #[serde(default)]
    log: logger::Config,
    #[serde(default)]
    server: server_config::Config,
    #[serde(default)]
    dashboard: libs::config::Config,
}

const PROJ_NAME: &'static str = env!("CARGO_BIN_NAME");
const PROJ_VER: &'static str = env!("CARGO_PKG_VERSION");
const STATIC_PATH: &'static str = "./static";
const SCOPE_PATH: &'static str = "/dashboard";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    const FN_NAME: &'static str = "main";

    let conf = match init_config() {
        Err(e) => {
            logger::init(&logger::Config::default());
            error!("[{}] read config error: {}", FN_NAME, e);
            return Ok(());
        }
        Ok(conf) => conf,
    };

    logger::init(&conf.log);

    let state = match routes::new_state(SCOPE_PATH, &conf.dashboard, None).await {
        Err(e) => {
            error!("[{}] new routes state error: {}", FN_NAME, e);
            return Ok(());
        }
        Ok(state) => state,
    };
    if state.gasoges.is_none() {
        info!("[{}] Gasoges credentials not set, fuel APIs disabled", FN_NAME);
    }
    if state.mundosms.token.is_none() {
        info!("[{}] MundoSMS token not set, call APIs disabled", FN_NAME);
    }

    let app = new_app(&state, &conf.server);
    let tls = match (
        conf.server.cert_file.as_ref(),
        conf.server.key_file.as_ref(),
    ) {
        (Some(cert_file), Some(key_file)) => match load_tls(cert_file, key_file).await {
            Err(e) => {
                error!("[{}] load TLS config error: {}", FN_NAME, e);
                return Ok(());
            }
            Ok(tls) => Some(tls),
        },
        _ => None,
    };

    let http_port = conf
        .server
        .http_port
        .unwrap_or(server_config::DEF_HTTP_PORT);
    let mut servers = vec![tokio::spawn(serve_http(any_addr(http_port), app.clone()))];
    if let Some(tls) = tls {
        let https_port = conf
            .server
            .https_port
            .unwrap_or(server_config::DEF_HTTPS_PORT);
        servers.push(tokio::spawn(serve_https(any_addr(https_port), tls, app)));
    }
    info!(
        "[{}] running {} service (v{})",
        FN_NAME, PROJ_NAME, PROJ_VER
    );
    future::join_all(servers).await;
    Ok(())
}

/// The dashboard routes with `/version`, `/metrics` and the static client as the fallback.
fn new_app(state: &routes::State, conf: &server_config::Config) -> Router {
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    let static_path = conf.static_path.as_deref().unwrap_or(STATIC_PATH);
    let timeout = conf.timeout_secs.unwrap_or(server_config::DEF_TIMEOUT_SECS);

    let router = Router::new()
        .merge(routes::new_service(state))
        .route("/version", routing::get(routes::get_version))
        .route(
            "/metrics",
            routing::get(|| async move { metric_handle.render() }),
        )
        .fallback_service(ServeDir::new(static_path));
    routes::with_server_layers(router, Duration::from_secs(timeout))
        .layer(prometheus_layer)
        .layer(LoggerLayer::new())
}

fn any_addr(port: u16) -> SocketAddr {
    SocketAddr::V6(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, port, 0, 0))
}

async fn load_tls(cert_file: &str, key_file: &str) -> Result<RustlsConfig, Box<dyn StdError>> {
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        return Err("init crypto provider error".into());
    }
    Ok(RustlsConfig::from_pem_file(cert_file, key_file).await?)
}

async fn serve_http(addr: SocketAddr, app: Router) {
    const FN_NAME: &'static str = "serve_http";

    let listener = match TcpListener::bind(addr).await {
        Err(e) => {
            error!("[{}] bind addr {} error: {}", FN_NAME, addr, e);
            return;
        }
        Ok(listener) => listener,
    };
    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, service).await {
        error!("[{}] launch HTTP server error: {}", FN_NAME, e);
    }
}

async fn serve_https(addr: SocketAddr, tls: RustlsConfig, app: Router) {
    const FN_NAME: &'static str = "serve_https";

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum_server::bind_rustls(addr, tls).serve(service).await {
        error!("[{}] launch HTTPS server error: {}", FN_NAME, e);
    }
}

/// To read the configuration file when `-f` is given, or command-line arguments and environment
/// variables otherwise.
fn init_config() -> Result<AppConfig, Box<dyn StdError>> {
    let mut args = Command::new(PROJ_NAME).version(PROJ_VER).arg(
        ClapArg::new("file")
            .short('f')
            .long("file")
            .help("config file")
            .num_args(1),
    );
    args = logger::reg_args(args);
    args = server_config::reg_args(args);
    args = libs::config::reg_args(args);
    let args = args.get_matches();

    if let Some(v) = args.get_one::<String>("file") {
        let conf_str = fs::read_to_string(v)?;
        let conf: AppConfig = json5::from_str(conf_str.as_str())?;
        return Ok(AppConfig {
            log: logger::apply_default(&conf.log),
            server: server_config::apply_default(&conf.server),
            dashboard: libs::config::apply_default(&conf.dashboard),
        });
    }

    Ok(AppConfig {
        log: logger::read_args(&args),
        server: server_config::read_args(&args),
        dashboard: libs::config::read_args(&args),
    })
}
