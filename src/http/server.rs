//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler and ACME challenge files
//! - Wire up middleware (tracing, request ID, CORS)
//! - Resolve each request's destination and hand it to the dispatcher
//! - Serve plain HTTP or TLS with graceful shutdown

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{ProxyConfig, TlsConfig};
use crate::http::dispatch::Dispatcher;
use crate::http::error::ProxyError;
use crate::http::landing::{LandingError, LandingPage};
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::lifecycle::shutdown::wait as shutdown_requested;
use crate::observability::metrics;
use crate::routing::{CanonicalPath, DestinationResolver};

/// Path prefix whose files are served from disk instead of proxied.
pub const ACME_CHALLENGE_PREFIX: &str = "/.well-known/acme-challenge";

/// How long TLS connections get to finish after shutdown is signalled.
const TLS_DRAIN_SECS: u64 = 10;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<DestinationResolver>,
    pub dispatcher: Dispatcher,
    pub landing: LandingPage,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails only if a configured landing template cannot be read.
    pub fn new(config: ProxyConfig) -> Result<Self, LandingError> {
        let landing = LandingPage::load(
            config.landing.template_path.as_deref(),
            &config.proxy.public_base_url(),
        )?;

        let connect_timeout = seconds(config.timeouts.connect_secs);
        let response_timeout = seconds(config.timeouts.response_secs);

        let state = AppState {
            resolver: Arc::new(DestinationResolver::new(&config.proxy.host)),
            dispatcher: Dispatcher::new(connect_timeout, response_timeout),
            landing,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let router = Router::new()
            .nest_service(
                ACME_CHALLENGE_PREFIX,
                ServeDir::new(&config.static_files.acme_challenge_dir),
            )
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
            .layer(TraceLayer::new_for_http());

        if config.cors.enabled {
            router.layer(cors_layer())
        } else {
            router
        }
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            host = %self.config.proxy.host,
            environment = ?self.config.proxy.environment,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_requested(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS using PEM files from `tls`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;

        tracing::info!(
            address = %addr,
            host = %self.config.proxy.host,
            cert_path = %tls.cert_path,
            "HTTPS server starting"
        );

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown_requested(shutdown).await;
            drain.graceful_shutdown(Some(Duration::from_secs(TLS_DRAIN_SECS)));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app)
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// `None` for 0, meaning no bound.
fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Any origin and any request header, with credentials. Both are mirrored
/// from the request because a literal `*` cannot be combined with
/// credentials.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::HEAD,
            Method::OPTIONS,
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Serve the landing page and count the hit.
fn landing_response(landing: &LandingPage, start_time: Instant) -> Response {
    let response = landing.clone().into_response();
    metrics::record_request(metrics::LANDING_MODE, response.status().as_u16(), start_time);
    response
}

/// Main proxy handler.
/// Serves the landing page at `/`, otherwise resolves and dispatches.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let path = CanonicalPath::from_uri(request.uri());

    if path.is_empty() {
        return landing_response(&state.landing, start_time);
    }

    let request_id = request_id(request.headers()).to_string();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let referer = request
        .headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok());

    let destination = match state.resolver.resolve(&path, referer) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                remote_addr = %remote_addr,
                path = %path,
                error = %e,
                "Malformed destination"
            );
            let response = ProxyError::from(e).into_response();
            metrics::record_request(metrics::NO_MODE, response.status().as_u16(), start_time);
            return response;
        }
    };

    tracing::info!(
        request_id = %request_id,
        remote_addr = %remote_addr,
        method = %request.method(),
        destination = %destination.url,
        mode = %destination.mode,
        via_referer = destination.rewritten_from_referer,
        "Incoming request"
    );

    let response = match state.dispatcher.dispatch(request, &destination).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                destination = %destination.url,
                error = %e,
                "Upstream error"
            );
            ProxyError::from(e).into_response()
        }
    };

    metrics::record_request(destination.mode.as_str(), response.status().as_u16(), start_time);
    response
}
