//! Mapping of request failures to client responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::http::dispatch::DispatchError;
use crate::routing::ResolveError;

/// Any failure that ends a proxied request early.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Resolve(_) => StatusCode::BAD_REQUEST,
            ProxyError::Dispatch(DispatchError::InvalidUri { .. }) => StatusCode::BAD_REQUEST,
            ProxyError::Dispatch(DispatchError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            ProxyError::Dispatch(DispatchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Dispatch(DispatchError::InvalidHost(_) | DispatchError::Request(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            // Parse error text goes back verbatim so the caller can fix the path.
            ProxyError::Resolve(e) => e.to_string(),
            ProxyError::Dispatch(DispatchError::InvalidUri { .. }) => self.to_string(),
            ProxyError::Dispatch(DispatchError::Upstream(_)) => "Upstream request failed".to_string(),
            ProxyError::Dispatch(DispatchError::Timeout(_)) => "Upstream timed out".to_string(),
            ProxyError::Dispatch(_) => "Internal proxy error".to_string(),
        };
        (status, body).into_response()
    }
}
