//! Provides the access control middleware with a static Bearer token list.
//!
//! When the list is empty, all requests pass through.

use std::{
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use tower::{Layer, Service};

use opsboard_corelib::{err::ErrResp, http as corelib_http};

#[derive(Clone)]
pub struct AccessService {
    tokens: Arc<Vec<String>>,
}

#[derive(Clone)]
pub struct AccessMiddleware<S> {
    tokens: Arc<Vec<String>>,
    service: S,
}

impl AccessService {
    pub fn new(tokens: Arc<Vec<String>>) -> Self {
        AccessService { tokens }
    }
}

impl<S> Layer<S> for AccessService {
    type Service = AccessMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AccessMiddleware {
            tokens: self.tokens.clone(),
            service: inner,
        }
    }
}

impl<S> Service<Request> for AccessMiddleware<S>
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
        let tokens = self.tokens.clone();

        Box::pin(async move {
            if tokens.is_empty() {
                return svc.call(req).await;
            }

            let token = match corelib_http::parse_bearer(req.headers()) {
                Err(e) => return Ok(e.into_response()),
                Ok(token) => match token {
                    None => {
                        let e = ErrResp::ErrAuth(Some("missing token".to_string()));
                        return Ok(e.into_response());
                    }
                    Some(token) => token,
                },
            };
            if !tokens.iter().any(|t| t.eq(&token)) {
                return Ok(ErrResp::ErrAuth(None).into_response());
            }
            svc.call(req).await
        })
    }
}
