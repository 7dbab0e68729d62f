//! To generate HTTP error response.
//!
//! ```
//! use opsboard_corelib::err::ErrResp;
//!
//! fn check(id: Option<&str>) -> Result<&str, ErrResp> {
//!     match id {
//!         None => Err(ErrResp::ErrParam(Some("missing `id`".to_string()))),
//!         Some(id) => Ok(id),
//!     }
//! }
//! # assert!(check(None).is_err());
//! ```

use std::{error::Error, fmt};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json;

/// The standard error definitions.
#[derive(Debug)]
pub enum ErrResp {
    ErrAuth(Option<String>),
    ErrConfig(Option<String>),
    ErrIntMsg(Option<String>),
    ErrNotFound(Option<String>),
    ErrParam(Option<String>),
    ErrUnknown(Option<String>),
    /// The upstream service responded with a non-success status code.
    ErrUpstream(u16, Option<String>),
}

/// Used for generating HTTP body for errors.
#[derive(Serialize)]
struct RespJson<'a> {
    code: &'a str,
    error: &'a str,
}

/// 401, token not authorized.
pub const E_AUTH: &'static str = "err_auth";
/// 500, required server-side configuration is missing.
pub const E_CONFIG: &'static str = "err_config";
/// 500, upstream communication (transport or payload) error.
pub const E_INT_MSG: &'static str = "err_int_msg";
/// 404, resource not found.
pub const E_NOT_FOUND: &'static str = "err_not_found";
/// 400, request parameter format error.
pub const E_PARAM: &'static str = "err_param";
/// 500, unknown error.
pub const E_UNKNOWN: &'static str = "err_unknown";
/// Upstream status, the upstream service returns failure.
pub const E_UPSTREAM: &'static str = "err_upstream";

impl ErrResp {
    /// The HTTP status code of the error.
    pub fn status(&self) -> StatusCode {
        match *self {
            ErrResp::ErrAuth(_) => StatusCode::UNAUTHORIZED,
            ErrResp::ErrConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ErrResp::ErrIntMsg(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ErrResp::ErrNotFound(_) => StatusCode::NOT_FOUND,
            ErrResp::ErrParam(_) => StatusCode::BAD_REQUEST,
            ErrResp::ErrUnknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ErrResp::ErrUpstream(code, _) => {
                StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// The error message without the code.
    pub fn message(&self) -> Option<&str> {
        match *self {
            ErrResp::ErrAuth(ref desc)
            | ErrResp::ErrConfig(ref desc)
            | ErrResp::ErrIntMsg(ref desc)
            | ErrResp::ErrNotFound(ref desc)
            | ErrResp::ErrParam(ref desc)
            | ErrResp::ErrUnknown(ref desc)
            | ErrResp::ErrUpstream(_, ref desc) => desc.as_deref(),
        }
    }

    fn code(&self) -> &'static str {
        match *self {
            ErrResp::ErrAuth(_) => E_AUTH,
            ErrResp::ErrConfig(_) => E_CONFIG,
            ErrResp::ErrIntMsg(_) => E_INT_MSG,
            ErrResp::ErrNotFound(_) => E_NOT_FOUND,
            ErrResp::ErrParam(_) => E_PARAM,
            ErrResp::ErrUnknown(_) => E_UNKNOWN,
            ErrResp::ErrUpstream(_, _) => E_UPSTREAM,
        }
    }

    fn resp_json(&'_ self) -> RespJson<'_> {
        let code = self.code();
        RespJson {
            code,
            error: self.message().unwrap_or(code),
        }
    }
}

impl fmt::Display for ErrResp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string(&self.resp_json()) {
            Err(_) => write!(f, "{}", self.code()),
            Ok(str) => write!(f, "{}", str),
        }
    }
}

impl Error for ErrResp {}

impl IntoResponse for ErrResp {
    fn into_response(self) -> Response {
        (self.status(), Json(self.resp_json())).into_response()
    }
}
