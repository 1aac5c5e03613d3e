//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the forwarding handler
//! - Wire up middleware (tracing, request id, timeout, body limit, throttle)
//! - Forward admitted transactions to the authentication origin
//! - Apply reloaded throttle policy while running

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderMap, Request, Uri, Version,
    },
    middleware,
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ThrottleConfig;
use crate::http::request::{propagate_request_id_layer, request_id_of, set_request_id_layer};
use crate::http::response;
use crate::observability::metrics;
use crate::store::{KvStore, ReadPolicy};
use crate::throttle::{throttle_middleware, ThrottlePolicy, ThrottleState};

/// Hop-by-hop headers that must not be forwarded.
const HOP_BY_HOP: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Application state injected into the forwarding handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// HTTP server for the 2FA throttle.
pub struct HttpServer {
    router: Router,
    config: ThrottleConfig,
    throttle: Arc<ThrottleState>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and store.
    pub fn new(config: ThrottleConfig, store: Arc<dyn KvStore>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let upstream = Authority::from_str(&config.upstream.address).unwrap_or_else(|e| {
            tracing::error!(address = %config.upstream.address, error = %e, "Invalid upstream address, using localhost");
            Authority::from_static("127.0.0.1:3000")
        });

        let throttle = Arc::new(ThrottleState::new(
            ThrottlePolicy::new(config.throttle.clone(), &config.routes),
            store,
            ReadPolicy::from(&config.store),
        ));

        let state = AppState { client, upstream };
        let router = Self::build_router(&config, state, throttle.clone());
        Self {
            router,
            config,
            throttle,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ThrottleConfig, state: AppState, throttle: Arc<ThrottleState>) -> Router {
        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(throttle, throttle_middleware))
            .layer(RequestBodyLimitLayer::new(config.upstream.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ThrottleConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            store = self.throttle.store.backend_name(),
            "HTTP server starting"
        );

        let throttle = self.throttle.clone();
        let running = self.config.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(new_config) => apply_reload(&throttle, &running, new_config),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Shared throttle state (for the admin API).
    pub fn throttle(&self) -> Arc<ThrottleState> {
        self.throttle.clone()
    }
}

/// Swap in the reloadable parts of `new_config`.
fn apply_reload(throttle: &ThrottleState, running: &ThrottleConfig, new_config: ThrottleConfig) {
    if new_config.store != running.store {
        tracing::warn!("Store settings are process-wide and need a restart to change");
    }
    if new_config.listener != running.listener || new_config.upstream != running.upstream {
        tracing::warn!("Listener and upstream settings need a restart to change");
    }

    throttle.update_policy(ThrottlePolicy::new(new_config.throttle.clone(), &new_config.routes));
    tracing::info!(
        default_max_attempts = new_config.throttle.default_max_attempts,
        routes = new_config.routes.len(),
        "Throttle policy reloaded"
    );
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Forward the request to the authentication origin.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id_of(&request);
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return response::origin_unavailable();
        }
    };
    strip_hop_by_hop(&mut parts.headers);
    parts.version = Version::HTTP_11;

    tracing::debug!(request_id = %request_id, method = %parts.method, uri = %parts.uri, "Forwarding to origin");

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(upstream_response) => {
            let (mut parts, body) = upstream_response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            metrics::record_request(parts.status.as_u16(), start_time);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_request(502, start_time);
            response::origin_unavailable()
        }
    }
}
