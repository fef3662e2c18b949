//! Outgoing request construction and response rewriting.
//!
//! # Responsibilities
//! - Copy the inbound method, headers and body onto a request for the
//!   resolved destination
//! - Reverse mode: present the destination's own host in `Host`
//! - Forward mode: turn the upstream response into a `307` pointing at the
//!   destination
//!
//! # Design Decisions
//! - Bodies are streamed in both directions, never buffered
//! - No retries and no fallback destination
//! - Transport errors surface as `DispatchError::Upstream` (502)
//! - An upstream that sends no response head within the configured bound
//!   surfaces as `DispatchError::Timeout` (504); body streaming is unbounded

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode, Uri},
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Position;

use crate::routing::{ProxyMode, ResolvedDestination};

/// Client used for all upstream round trips.
pub type HttpClient = Client<HttpConnector, Body>;

/// Errors raised while talking to the destination.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("destination {uri:?} is not a valid request URI: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },

    #[error("destination host is not a valid header value: {0}")]
    InvalidHost(#[from] axum::http::header::InvalidHeaderValue),

    #[error("failed to build outgoing request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

/// Sends requests to resolved destinations.
#[derive(Clone)]
pub struct Dispatcher {
    client: HttpClient,
    response_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher. `connect_timeout` bounds TCP connection setup;
    /// `response_timeout` bounds the wait for the upstream's response head.
    pub fn new(connect_timeout: Option<Duration>, response_timeout: Option<Duration>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(connect_timeout);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            response_timeout,
        }
    }

    /// Forward `request` to `destination` and shape the response for `mode`.
    pub async fn dispatch(
        &self,
        request: Request<Body>,
        destination: &ResolvedDestination,
    ) -> Result<Response, DispatchError> {
        let outgoing = build_outgoing(request, destination)?;

        tracing::debug!(
            method = %outgoing.method(),
            uri = %outgoing.uri(),
            host = ?outgoing.headers().get(header::HOST),
            "Sending upstream request"
        );

        let pending = self.client.request(outgoing);
        let response = match self.response_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| DispatchError::Timeout(limit))??,
            None => pending.await?,
        };
        let (parts, body) = response.into_parts();
        let mut response = Response::from_parts(parts, Body::new(body));

        rewrite_response(&mut response, destination);
        Ok(response)
    }
}

/// Rebuild `request` so it targets `destination`.
pub fn build_outgoing(
    request: Request<Body>,
    destination: &ResolvedDestination,
) -> Result<Request<Body>, DispatchError> {
    let (parts, body) = request.into_parts();

    let target = &destination.url[..Position::AfterQuery];
    let uri: Uri = target.parse().map_err(|source| DispatchError::InvalidUri {
        uri: target.to_string(),
        source,
    })?;

    let mut outgoing = Request::builder()
        .method(parts.method)
        .uri(uri)
        .body(body)?;
    *outgoing.headers_mut() = parts.headers;

    if destination.mode == ProxyMode::Reverse {
        let host = HeaderValue::from_str(&destination.authority())?;
        outgoing.headers_mut().insert(header::HOST, host);
    }

    Ok(outgoing)
}

/// Forward mode replaces whatever the upstream said with a redirect to the
/// destination. Reverse mode passes the response through untouched.
pub fn rewrite_response(response: &mut Response, destination: &ResolvedDestination) {
    if destination.mode != ProxyMode::Forward {
        return;
    }

    *response.status_mut() = StatusCode::TEMPORARY_REDIRECT;
    match HeaderValue::from_str(destination.url.as_str()) {
        Ok(location) => {
            response.headers_mut().insert(header::LOCATION, location);
        }
        Err(e) => {
            tracing::warn!(destination = %destination.url, error = %e, "Cannot set Location header");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{CanonicalPath, DestinationResolver};

    fn resolve(path: &str) -> ResolvedDestination {
        let uri: Uri = path.parse().unwrap();
        DestinationResolver::new("proxyhost")
            .resolve(&CanonicalPath::from_uri(&uri), None)
            .unwrap()
    }

    fn inbound() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/whatever")
            .header(header::HOST, "proxyhost")
            .header("x-custom", "kept")
            .body(Body::from("payload"))
            .unwrap()
    }

    #[test]
    fn test_reverse_overrides_host() {
        let dest = resolve("/reverse/origin.example:8080/a/b?x=1");
        let out = build_outgoing(inbound(), &dest).unwrap();

        assert_eq!(out.method(), "POST");
        assert_eq!(out.uri(), "http://origin.example:8080/a/b?x=1");
        assert_eq!(out.headers()[header::HOST], "origin.example:8080");
        assert_eq!(out.headers()["x-custom"], "kept");
    }

    #[test]
    fn test_forward_keeps_client_host() {
        let dest = resolve("/forward/origin.example/a");
        let out = build_outgoing(inbound(), &dest).unwrap();

        assert_eq!(out.uri(), "http://origin.example/a");
        assert_eq!(out.headers()[header::HOST], "proxyhost");
    }

    #[test]
    fn test_forward_response_becomes_redirect() {
        let dest = resolve("/forward/origin.example/a?b=c");
        for upstream_status in [StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
            let mut response = axum::http::Response::builder()
                .status(upstream_status)
                .body(Body::empty())
                .unwrap();
            rewrite_response(&mut response, &dest);

            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(response.headers()[header::LOCATION], "http://origin.example/a?b=c");
        }
    }

    #[test]
    fn test_reverse_response_passes_through() {
        let dest = resolve("/reverse/origin.example/a");
        let mut response = axum::http::Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())
            .unwrap();
        rewrite_response(&mut response, &dest);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::LOCATION).is_none());
    }
}
