//! String libraries.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;
use url::Url;

/// Date format used by the upstream APIs (`YYYY-MM-DD`).
pub const DATE_FORMAT: &'static str = "%Y-%m-%d";

/// To convert time to ISO8601 format with milliseconds precision (`YYYY-MM-DDThh:mm:ss.SSSZ`).
pub fn time_str(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// To format a date as `YYYY-MM-DD`.
pub fn ymd(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// To check if the string is a zero-padded `YYYY-MM-DD` date.
pub fn is_ymd(date: &str) -> bool {
    date.len() == 10 && NaiveDate::parse_from_str(date, DATE_FORMAT).is_ok()
}

/// To read a finite number from a JSON number or a numeric string.
///
/// Strings may use a decimal comma (`"12,5"`).
pub fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.replace(',', ".").parse::<f64>().ok()?
        }
        _ => return None,
    };
    match n.is_finite() {
        false => None,
        true => Some(n),
    }
}

/// To build an URL by appending percent-encoded path segments to the base.
pub fn url_with_segments(base: &str, segments: &[&str]) -> Result<Url, String> {
    let mut url = match Url::parse(base) {
        Err(e) => return Err(format!("invalid base URL {}: {}", base, e)),
        Ok(url) => url,
    };
    match url.path_segments_mut() {
        Err(_) => return Err(format!("base URL {} cannot have paths", base)),
        Ok(mut paths) => {
            paths.pop_if_empty().extend(segments);
        }
    }
    Ok(url)
}

/// To escape text for XML element content.
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
