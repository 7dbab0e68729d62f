//! The top level configuration `server`.

use std::env;

use clap::{Arg, ArgMatches, Command, builder::RangedU64ValueParser};
use serde::Deserialize;

/// Server configuration object.
#[derive(Default, Deserialize)]
pub struct Config {
    /// HTTP port.
    ///
    /// Default is `1080`.
    #[serde(rename = "httpPort")]
    pub http_port: Option<u16>,
    /// HTTPS port.
    ///
    /// Default is `1443`.
    #[serde(rename = "httpsPort")]
    pub https_port: Option<u16>,
    /// HTTPS certificate file path. Missing this to disable HTTPS.
    #[serde(rename = "certFile")]
    pub cert_file: Option<String>,
    /// HTTPS private key file path. Missing this to disable HTTPS.
    #[serde(rename = "keyFile")]
    pub key_file: Option<String>,
    /// Static file path for the single-page client.
    #[serde(rename = "staticPath")]
    pub static_path: Option<String>,
    /// Request timeout in seconds.
    ///
    /// Default is `60`.
    #[serde(rename = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

pub const DEF_HTTP_PORT: u16 = 1080;
pub const DEF_HTTPS_PORT: u16 = 1443;
pub const DEF_TIMEOUT_SECS: u64 = 60;

/// To register Clap arguments.
pub fn reg_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("server.httpport")
            .long("server.httpport")
            .help("HTTP port")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(1..=65535)),
    )
    .arg(
        Arg::new("server.httpsport")
            .long("server.httpsport")
            .help("HTTPS port")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(1..=65535)),
    )
    .arg(
        Arg::new("server.certfile")
            .long("server.certfile")
            .help("HTTPS certificate file")
            .num_args(1),
    )
    .arg(
        Arg::new("server.keyfile")
            .long("server.keyfile")
            .help("HTTPS private key file")
            .num_args(1),
    )
    .arg(
        Arg::new("server.static")
            .long("server.static")
            .help("Static files directory path")
            .num_args(1),
    )
    .arg(
        Arg::new("server.timeout")
            .long("server.timeout")
            .help("request timeout in seconds")
            .num_args(1)
            .value_parser(RangedU64ValueParser::<u64>::new().range(1..=3600)),
    )
}

/// To read input arguments from command-line arguments and environment variables.
///
/// Command-line arguments take precedence over environment variables. This function will call
/// [`apply_default()`] to fill missing values so you do not need call it again.
pub fn read_args(args: &ArgMatches) -> Config {
    apply_default(&Config {
        http_port: read_port(args, "server.httpport", "SERVER_HTTP_PORT"),
        https_port: read_port(args, "server.httpsport", "SERVER_HTTPS_PORT"),
        cert_file: read_string(args, "server.certfile", "SERVER_CERT_FILE"),
        key_file: read_string(args, "server.keyfile", "SERVER_KEY_FILE"),
        static_path: read_string(args, "server.static", "SERVER_STATIC_PATH"),
        timeout_secs: match args.try_get_one::<u64>("server.timeout") {
            Ok(Some(v)) => Some(*v),
            _ => env::var("SERVER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok()),
        },
    })
}

/// Fill missing configuration with default values.
pub fn apply_default(config: &Config) -> Config {
    Config {
        http_port: Some(config.http_port.unwrap_or(DEF_HTTP_PORT)),
        https_port: Some(config.https_port.unwrap_or(DEF_HTTPS_PORT)),
        cert_file: config.cert_file.clone(),
        key_file: config.key_file.clone(),
        static_path: config.static_path.clone(),
        timeout_secs: match config.timeout_secs {
            None | Some(0) => Some(DEF_TIMEOUT_SECS),
            Some(v) => Some(v),
        },
    }
}

fn read_port(args: &ArgMatches, arg: &str, env_name: &str) -> Option<u16> {
    match args.try_get_one::<u64>(arg) {
        Ok(Some(v)) => Some(*v as u16),
        _ => match env::var(env_name) {
            Err(_) => None,
            Ok(v) => v.parse::<u16>().ok(),
        },
    }
}

fn read_string(args: &ArgMatches, arg: &str, env_name: &str) -> Option<String> {
    match args.try_get_one::<String>(arg) {
        Ok(Some(v)) => Some(v.clone()),
        _ => env::var(env_name).ok(),
    }
}
