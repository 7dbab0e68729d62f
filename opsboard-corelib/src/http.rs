//! Axum extractors that reject with [`ErrResp`] and HTTP header helpers.

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::err::ErrResp;

/// JSON body extractor/responder. Rejects with `err_param`.
pub struct Json<T>(pub T);

/// Query string extractor. Rejects with `err_param`.
pub struct Query<T>(pub T);


impl<T, S> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrResp;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Err(e) => Err(ErrResp::ErrParam(Some(e.body_text()))),
            Ok(body) => Ok(Json(body.0)),
        }
    }
}

impl<T> IntoResponse for Json<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl<T, S> FromRequestParts<S> for Query<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ErrResp;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Query::<T>::from_request_parts(parts, state).await {
            Err(e) => Err(ErrResp::ErrParam(Some(e.body_text()))),
            Ok(query) => Ok(Query(query.0)),
        }
    }
}

/// Parse Authorization header content. Returns `None` means no Authorization header.
pub fn parse_header_auth(headers: &HeaderMap) -> Result<Option<String>, ErrResp> {
    let mut auth_all = headers.get_all(header::AUTHORIZATION).iter();
    let auth = match auth_all.next() {
        None => return Ok(None),
        Some(auth) => match auth.to_str() {
            Err(e) => return Err(ErrResp::ErrParam(Some(e.to_string()))),
            Ok(auth) => auth,
        },
    };
    if auth_all.next().is_some() {
        return Err(ErrResp::ErrParam(Some(
            "invalid multiple Authorization header".to_string(),
        )));
    }
    Ok(Some(auth.to_string()))
}

/// Extract the token of a `Bearer` Authorization header.
pub fn parse_bearer(headers: &HeaderMap) -> Result<Option<String>, ErrResp> {
    match parse_header_auth(headers)? {
        None => Ok(None),
        Some(auth) => match auth.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
                Ok(Some(token.trim().to_string()))
            }
            _ => Err(ErrResp::ErrAuth(Some("invalid Authorization scheme".to_string()))),
        },
    }
}
