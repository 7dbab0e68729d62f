//! To configure the logger and to log HTTP requests.

use std::{
    env,
    net::SocketAddr,
    task::{Context, Poll},
    time::Instant,
};

use anyhow::Result;
use axum::{
    extract::{ConnectInfo, Request},
    response::Response,
};
use chrono::{SecondsFormat, Utc};
use clap::{Arg, ArgMatches, Command};
use futures::future::BoxFuture;
use log::{Level, LevelFilter, Record, info};
use log4rs::{
    self,
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::{Encode, Write},
};
use serde::{Deserialize, Serialize};
use tower::Service;
use tower_layer::Layer;

/// Logger configuration object.
#[derive(Default, Deserialize)]
pub struct Config {
    /// Log level. Can be `off`, `error`, `warn`, `info`, `debug`.
    ///
    /// Default is `info`.
    pub level: Option<String>,
    /// Log style. Can be `json`, `log4j`.
    ///
    /// Default is `json`.
    pub style: Option<String>,
}

/// The tower layer that logs one line for each HTTP request.
#[derive(Clone, Default)]
pub struct LoggerLayer;

#[derive(Clone)]
pub struct LoggerMiddleware<S> {
    service: S,
}

/// The log4rs console encoder. One line per record in the configured style.
#[derive(Debug)]
struct ConsoleEncoder {
    style: Style,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Style {
    Json,
    Log4j,
}

/// Application log line.
#[derive(Debug, Serialize)]
struct AppLine {
    ts: String,
    level: String,
    module: String,
    msg: String,
}

/// HTTP access log line.
#[derive(Debug, Serialize)]
struct HttpLine {
    ts: String,
    level: String,
    remote: String,
    status: String,
    method: String,
    url: String,
    #[serde(rename = "latencyMs")]
    latency_ms: String,
}

/// The log target of HTTP request lines.
///
/// The message format is `[remote] [status] [latency-ms] [url] [method]`.
pub const HTTP_LOGGER_NAME: &'static str = "opsboard::http";

pub const LEVEL_OFF: &'static str = "off";
pub const LEVEL_ERROR: &'static str = "error";
pub const LEVEL_WARN: &'static str = "warn";
pub const LEVEL_INFO: &'static str = "info";
pub const LEVEL_DEBUG: &'static str = "debug";

pub const STYLE_JSON: &'static str = "json";
pub const STYLE_LOG4J: &'static str = "log4j";

pub const DEF_LEVEL: &'static str = LEVEL_INFO;
pub const DEF_STYLE: &'static str = STYLE_JSON;

/// Only requests of these paths are logged.
pub const FILTER_ONLY: [&'static str; 1] = ["/api/"];

impl Encode for ConsoleEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record<'_>) -> Result<()> {
        let line = match record.target() == HTTP_LOGGER_NAME {
            false => match app_line(record) {
                None => return Ok(()),
                Some(line) => match self.style {
                    Style::Json => serde_json::to_string(&line)?,
                    Style::Log4j => format!(
                        "{} {} [{}] {}",
                        line.ts,
                        line.level.to_uppercase(),
                        line.module,
                        line.msg.replace('\n', "\\n")
                    ),
                },
            },
            true => match http_line(record) {
                None => return Ok(()),
                Some(line) => match self.style {
                    Style::Json => serde_json::to_string(&line)?,
                    Style::Log4j => format!(
                        "{} {} [{}] {} {} {} ({} ms)",
                        line.ts,
                        line.level.to_uppercase(),
                        line.remote,
                        line.status,
                        line.method,
                        line.url,
                        line.latency_ms,
                    ),
                },
            },
        };
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
        Ok(())
    }
}

impl LoggerLayer {
    pub fn new() -> Self {
        LoggerLayer {}
    }
}

impl<S> Layer<S> for LoggerLayer {
    type Service = LoggerMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggerMiddleware { service: inner }
    }
}

impl<S> Service<Request> for LoggerMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let mut svc = self.service.clone();

        Box::pin(async move {
            let start = Instant::now();
            let remote = match req.extensions().get::<ConnectInfo<SocketAddr>>() {
                None => "-".to_string(),
                Some(info) => info.0.to_string(),
            };
            let method = req.method().to_string();
            let url = req.uri().to_string();

            let res = svc.call(req).await?;
            info!(
                target: HTTP_LOGGER_NAME,
                "{} {} {} {} {}",
                remote,
                res.status().as_u16(),
                start.elapsed().as_millis(),
                url,
                method
            );
            Ok(res)
        })
    }
}

/// To initialize the logger with configurations.
pub fn init(conf: &Config) {
    let conf = apply_default(conf);

    let level = match conf.level.as_deref().unwrap_or(DEF_LEVEL) {
        LEVEL_OFF => LevelFilter::Off,
        LEVEL_ERROR => LevelFilter::Error,
        LEVEL_WARN => LevelFilter::Warn,
        LEVEL_DEBUG => LevelFilter::Debug,
        _ => LevelFilter::Info,
    };
    let style = match conf.style.as_deref() {
        Some(STYLE_LOG4J) => Style::Log4j,
        _ => Style::Json,
    };

    let console = ConsoleAppender::builder()
        .encoder(Box::new(ConsoleEncoder { style }))
        .build();
    let config = match log4rs::Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .build(Root::builder().appender("console").build(level))
    {
        Err(e) => {
            eprintln!("build logger config error: {}", e);
            return;
        }
        Ok(config) => config,
    };
    if let Err(e) = log4rs::init_config(config) {
        eprintln!("init logger error: {}", e);
    }
}

/// To register Clap arguments.
pub fn reg_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("log.level")
            .long("log.level")
            .help("log level")
            .num_args(1)
            .value_parser([LEVEL_OFF, LEVEL_ERROR, LEVEL_WARN, LEVEL_INFO, LEVEL_DEBUG]),
    )
    .arg(
        Arg::new("log.style")
            .long("log.style")
            .help("log style")
            .num_args(1)
            .value_parser([STYLE_JSON, STYLE_LOG4J]),
    )
}

/// To read input arguments from command-line arguments and environment variables.
///
/// This function will call [`apply_default()`] to fill missing values so you do not need call it
/// again.
pub fn read_args(args: &ArgMatches) -> Config {
    let level = match args.try_get_one::<String>("log.level") {
        Ok(Some(v)) => Some(v.clone()),
        _ => env::var("LOG_LEVEL").ok(),
    };
    let style = match args.try_get_one::<String>("log.style") {
        Ok(Some(v)) => Some(v.clone()),
        _ => env::var("LOG_STYLE").ok(),
    };
    apply_default(&Config { level, style })
}

/// Fill missing configuration with default values.
pub fn apply_default(config: &Config) -> Config {
    Config {
        level: match config.level.as_deref() {
            Some(v @ (LEVEL_OFF | LEVEL_ERROR | LEVEL_WARN | LEVEL_INFO | LEVEL_DEBUG)) => {
                Some(v.to_string())
            }
            _ => Some(DEF_LEVEL.to_string()),
        },
        style: match config.style.as_deref() {
            Some(STYLE_LOG4J) => Some(STYLE_LOG4J.to_string()),
            _ => Some(STYLE_JSON.to_string()),
        },
    }
}

fn is_filtered(url: &str) -> bool {
    FILTER_ONLY.iter().any(|filter| url.contains(filter))
}

fn now_str() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Records of third-party crates (built from the cargo registry) are skipped.
fn app_line(record: &Record<'_>) -> Option<AppLine> {
    let module = match (record.file(), record.line()) {
        (Some(file), _) if file.contains("/.cargo/") => return None,
        (Some(file), Some(line)) => format!("{}:{}", file, line),
        (Some(file), None) => file.to_string(),
        (None, _) => record.module_path()?.to_string(),
    };
    Some(AppLine {
        ts: now_str(),
        level: record.level().to_string().to_lowercase(),
        module,
        msg: record.args().to_string(),
    })
}

/// Access lines are `remote status latency-ms url method`. The level follows the status class.
fn http_line(record: &Record<'_>) -> Option<HttpLine> {
    let msg = record.args().to_string();
    let fields: Vec<&str> = msg.split(' ').collect();
    let [remote, status, latency_ms, url, method] = fields.as_slice() else {
        return None;
    };
    if !is_filtered(url) {
        return None;
    }
    let level = match status.as_bytes().first() {
        Some(b'4') => Level::Warn,
        Some(b'5') => Level::Error,
        _ => Level::Info,
    };
    Some(HttpLine {
        ts: now_str(),
        level: level.to_string().to_lowercase(),
        remote: remote.to_string(),
        status: status.to_string(),
        method: method.to_string(),
        url: url.to_string(),
        latency_ms: latency_ms.to_string(),
    })
}
