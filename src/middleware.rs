use std::sync::Arc;

use async_trait::async_trait;
use httpclient::{
    header, InMemoryRequest, Method, Middleware, Next, ProtocolError, ProtocolResult, RequestBuilder,
    Response, ResponseExt, Uri,
};
use serde_json::Value;
use tracing::warn;

use crate::error::Error;
use crate::interceptor::{AuthRequest, HttpStatus, Interceptor};
use crate::refresh::RefreshRequest;
use crate::session::SessionTokens;

impl AuthRequest for InMemoryRequest {
    fn url(&self) -> String {
        self.uri().to_string()
    }

    fn set_bearer(&mut self, token: &str) {
        match format!("Bearer {token}").parse() {
            Ok(value) => {
                self.headers_mut().insert(header::AUTHORIZATION, value);
            }
            Err(_) => warn!("access token is not a valid header value, sending without it"),
        }
    }
}

impl HttpStatus for Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// `httpclient` middleware that runs every request through an [`Interceptor`].
///
/// The refresh call goes through the rest of the middleware chain, so it is
/// never intercepted itself.
#[derive(Debug, Clone)]
pub struct AuthMiddleware {
    interceptor: Arc<Interceptor>,
    refresh_endpoint: String,
}

impl AuthMiddleware {
    pub fn new(interceptor: Arc<Interceptor>, refresh_endpoint: impl Into<String>) -> Self {
        Self {
            interceptor,
            refresh_endpoint: refresh_endpoint.into(),
        }
    }

    pub fn interceptor(&self) -> &Arc<Interceptor> {
        &self.interceptor
    }

    async fn refresh(&self, next: &Next<'_>, refresh_token: String) -> crate::Result<SessionTokens> {
        let uri: Uri = self.refresh_endpoint.parse().map_err(Error::transport)?;
        let refresh_req = RequestBuilder::new(next.client, Method::POST, uri)
            .json(RefreshRequest {
                refresh_token: &refresh_token,
            })
            .build();
        let res = next.run(refresh_req).await?;
        let status = res.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(Error::RefreshRejected { status });
        }
        let payload: Value = res.json().await.map_err(|e| match e {
            httpclient::Error::Protocol(ProtocolError::JsonError(e)) => Error::MalformedPayload(e),
            e => Error::transport(e),
        })?;
        SessionTokens::from_payload(payload)
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(&self, request: InMemoryRequest, next: Next<'_>) -> ProtocolResult<Response> {
        let next = &next;
        self.interceptor
            .intercept(
                request,
                |req: InMemoryRequest| next.run(req.into()),
                |refresh_token| self.refresh(next, refresh_token),
            )
            .await
    }
}
