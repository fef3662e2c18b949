//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Build the HTTP server (landing page rendered here, once)
//! - Bind the listener last, plain or TLS
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal to the caller
//! - Expects an already validated config

use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::ProxyConfig;
use crate::http::{HttpServer, LandingError};
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid {what} address {value:?}")]
    Address { what: &'static str, value: String },

    #[error(transparent)]
    Landing(#[from] LandingError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

fn parse_addr(what: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        what,
        value: value.to_string(),
    })
}

/// Bring the proxy up and serve until `shutdown` fires.
pub async fn start(config: ProxyConfig, shutdown: broadcast::Receiver<()>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr = parse_addr("metrics", &config.observability.metrics_address)?;
        metrics::init_metrics(addr)?;
    }

    let bind = parse_addr("bind", &config.listener.bind_address)?;
    let tls = config.listener.tls.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => server.run_tls(bind, &tls, shutdown).await?,
        None => {
            let listener = TcpListener::bind(bind).await?;
            server.run(listener, shutdown).await?
        }
    }

    Ok(())
}
