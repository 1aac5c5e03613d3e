//! 2FA failure throttling.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → identity.rs (client-IP header → store key)
//!     → context.rs (max attempts override)
//!     → gate.rs (bounded read, allow or 403)
//!     → [authentication origin]
//!     → recorder.rs (status != 200 → fire-and-forget increment)
//!     → Response to client
//! ```
//!
//! # Design Decisions
//! - The transaction context is a local of one middleware call, never shared
//! - The client-IP and max-attempts headers are honored only from trusted
//!   proxies; any other peer is identified by its socket address
//! - Fail open on every store problem
//! - The write is issued after the origin answered and is never awaited

pub mod context;
pub mod gate;
pub mod identity;
pub mod record;
pub mod recorder;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, Request},
    middleware::Next,
    response::Response,
};

use crate::config::schema::{RouteConfig, ThrottleSettings};
use crate::http::request::request_id_of;
use crate::http::response::{self, OriginUnavailable};
use crate::routing::RouteTable;
use crate::store::{KvStore, ReadPolicy};

pub use context::{parse_max_attempts, TransactionContext, DEFAULT_MAX_ATTEMPTS};
pub use gate::{Admission, AttemptGate};
pub use identity::{ClientIdentity, IdentityError};
pub use record::ClientRecord;
pub use recorder::{Outcome, OutcomeRecorder, APPROVED_STATUS};

/// Hot-reloadable part of the throttle configuration, compiled for the
/// request path.
#[derive(Debug)]
pub struct ThrottlePolicy {
    pub settings: ThrottleSettings,
    pub routes: RouteTable,
    client_ip_header: HeaderName,
    max_attempts_header: HeaderName,
}

fn header_or(value: &str, fallback: &'static str) -> HeaderName {
    HeaderName::from_bytes(value.as_bytes()).unwrap_or_else(|_| {
        tracing::warn!(header = %value, fallback, "Invalid header name, using fallback");
        HeaderName::from_static(fallback)
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl ThrottlePolicy {
    pub fn new(settings: ThrottleSettings, routes: &[RouteConfig]) -> Self {
        Self {
            client_ip_header: header_or(&settings.client_ip_header, "x-real-ip"),
            max_attempts_header: header_or(&settings.max_attempts_header, "x-2fa-max-attempts"),
            routes: RouteTable::from_config(routes),
            settings,
        }
    }

    pub fn client_ip_header(&self) -> &HeaderName {
        &self.client_ip_header
    }

    pub fn max_attempts_header(&self) -> &HeaderName {
        &self.max_attempts_header
    }

    /// Whether `peer` may set the client-IP and max-attempts headers.
    pub fn is_trusted(&self, peer: IpAddr) -> bool {
        self.settings.trusted_proxies.contains(&peer.to_canonical())
    }
}

/// Shared state for the throttle middleware.
pub struct ThrottleState {
    pub policy: ArcSwap<ThrottlePolicy>,
    pub gate: AttemptGate,
    pub recorder: OutcomeRecorder,
    pub store: Arc<dyn KvStore>,
}

impl ThrottleState {
    pub fn new(policy: ThrottlePolicy, store: Arc<dyn KvStore>, read_policy: ReadPolicy) -> Self {
        Self {
            policy: ArcSwap::from_pointee(policy),
            gate: AttemptGate::new(store.clone(), read_policy),
            recorder: OutcomeRecorder::new(store.clone()),
            store,
        }
    }

    /// Swap in a new policy; in-flight transactions keep the one they loaded.
    pub fn update_policy(&self, policy: ThrottlePolicy) {
        self.policy.store(Arc::new(policy));
    }
}

/// Run the attempt gate before the origin and the outcome recorder after it.
pub async fn throttle_middleware(
    State(state): State<Arc<ThrottleState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let policy = state.policy.load_full();
    if !policy.settings.enabled || !policy.routes.is_throttled(&request) {
        return next.run(request).await;
    }

    let request_id = request_id_of(&request);
    let trusted = policy.is_trusted(peer.ip());

    let (raw_ip, requested_max) = if trusted {
        (
            header_str(request.headers(), &policy.client_ip_header).map(str::to_string),
            header_str(request.headers(), &policy.max_attempts_header).map(str::to_string),
        )
    } else {
        if request.headers().contains_key(&policy.client_ip_header)
            || request.headers().contains_key(&policy.max_attempts_header)
        {
            tracing::warn!(request_id = %request_id, peer = %peer, "Ignoring throttle headers from untrusted peer");
        }
        request.headers_mut().remove(&policy.client_ip_header);
        (Some(peer.ip().to_canonical().to_string()), None)
    };
    request.headers_mut().remove(&policy.max_attempts_header);

    let client_identity = match identity::resolve(raw_ip.as_deref(), &policy.settings.identity) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejecting transaction without client address");
            return response::missing_client_address();
        }
    };
    let max_attempts = parse_max_attempts(requested_max.as_deref(), policy.settings.default_max_attempts);

    let ctx = match state.gate.admit(request_id, client_identity, max_attempts).await {
        Admission::Proceed(ctx) => ctx,
        Admission::Reject { .. } => return response::too_many_failures(),
    };

    let response = next.run(request).await;

    if response.extensions().get::<OriginUnavailable>().is_some() {
        tracing::debug!(request_id = %ctx.request_id, "Origin unavailable, attempt not counted");
        return response;
    }
    state.recorder.record(&ctx, response.status());
    response
}
