//! Tower middleware running the request gate in front of the tool routes.
//!
//! For every request:
//!
//! 1. Build [`RequestFacts`] (resolving the client address) and call
//!    [`RequestGate::validate_request`].
//! 2. On rejection answer `403` with a `SECURITY_VIOLATION` body; otherwise
//!    store the [`ClientAddress`] in request extensions and call the inner
//!    service.
//! 3. Add CORS headers and the Content-Security-Policy to the response,
//!    whichever path produced it, so error responses are readable by the
//!    browser too.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::header::CONTENT_SECURITY_POLICY;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};

use super::ip::UNKNOWN_ADDRESS;
use crate::error::AppError;
use crate::security::{RequestFacts, RequestGate};

/// Client address resolved by the gate, available to handlers.
///
/// Extracting it outside the gate yields [`UNKNOWN_ADDRESS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddress {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ClientAddress>()
            .cloned()
            .unwrap_or_else(|| ClientAddress(UNKNOWN_ADDRESS.to_string())))
    }
}

/// Layer applying [`RequestGate`] to every request.
#[derive(Clone)]
pub struct GateLayer {
    gate: Arc<RequestGate>,
}

impl GateLayer {
    pub fn new(gate: Arc<RequestGate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GateService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GateService<S> {
    inner: S,
    gate: Arc<RequestGate>,
}

impl<S> Service<Request<Body>> for GateService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let mut inner = self.inner.clone();

        let facts = RequestFacts::from_request(&req, &gate.config().trusted_proxies);
        let decision = gate.validate_request(&facts);
        let response_headers = security_headers(&gate, facts.origin.as_deref());

        Box::pin(async move {
            let mut response = match decision.rejection {
                Some(reason) => AppError::Forbidden(reason.as_str().to_string()).into_response(),
                None => {
                    req.extensions_mut()
                        .insert(ClientAddress(facts.client_address));
                    inner.call(req).await?
                }
            };

            response.headers_mut().extend(response_headers);
            Ok(response)
        })
    }
}

fn security_headers(gate: &RequestGate, origin: Option<&str>) -> HeaderMap {
    let mut headers = gate.cors_headers(origin);
    if let Ok(csp) = HeaderValue::from_str(gate.csp_header()) {
        headers.insert(CONTENT_SECURITY_POLICY, csp);
    }
    headers
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{Method, StatusCode};
    use axum::routing::post;
    use tower::ServiceExt;

    use crate::security::SecurityConfig;

    async fn echo_address(ClientAddress(addr): ClientAddress) -> String {
        addr
    }

    fn app() -> Router {
        let gate = Arc::new(RequestGate::in_memory(SecurityConfig::default(), 100));
        Router::new()
            .route("/echo", post(echo_address))
            .layer(GateLayer::new(gate))
    }

    #[tokio::test]
    async fn test_allowed_request_gets_headers_and_address() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header("origin", "https://example.com")
            .header("user-agent", "Mozilla/5.0")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://example.com"
        );
        assert!(response.headers().contains_key("content-security-policy"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"203.0.113.9");
    }

    #[tokio::test]
    async fn test_rejected_request_is_403_with_cors() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header("origin", "https://example.com")
            .header("user-agent", "python-requests/2.31")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(
            response
                .headers()
                .contains_key("access-control-allow-origin")
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["type"], "SECURITY_VIOLATION");
    }
}
