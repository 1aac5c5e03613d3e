use std::net::IpAddr;

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::config::schema::IdentityConfig;
use crate::http::response;
use crate::store::read_bounded;
use crate::throttle::{identity, ClientRecord};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub store_backend: &'static str,
}

#[derive(Serialize)]
pub struct PolicyView {
    pub enabled: bool,
    pub default_max_attempts: u32,
    pub client_ip_header: String,
    pub max_attempts_header: String,
    pub trusted_proxies: Vec<IpAddr>,
    pub identity: IdentityConfig,
    pub routes: Vec<String>,
}

#[derive(Serialize)]
pub struct ClientView {
    pub identity: String,
    /// `None` when the client has no record or it could not be read.
    pub failed_attempts: Option<u64>,
    pub max_attempts: u32,
    pub blocked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_error: Option<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        store_backend: state.throttle.store.backend_name(),
    })
}

pub async fn get_policy(State(state): State<AdminState>) -> Json<PolicyView> {
    let policy = state.throttle.policy.load();
    Json(PolicyView {
        enabled: policy.settings.enabled,
        default_max_attempts: policy.settings.default_max_attempts,
        client_ip_header: policy.settings.client_ip_header.clone(),
        max_attempts_header: policy.settings.max_attempts_header.clone(),
        trusted_proxies: policy.settings.trusted_proxies.clone(),
        identity: policy.settings.identity.clone(),
        routes: policy.routes.names(),
    })
}

/// Look up `ip` the way the gate would, against the default threshold.
pub async fn get_client(State(state): State<AdminState>, Path(ip): Path<String>) -> Result<Json<ClientView>, Response> {
    let policy = state.throttle.policy.load_full();
    let max_attempts = policy.settings.default_max_attempts;
    let key = match identity::resolve(Some(&ip), &policy.settings.identity) {
        Ok(identity) => identity.as_str().to_string(),
        Err(_) => return Err(response::missing_client_address()),
    };

    let (failed_attempts, read_error) =
        match read_bounded(state.throttle.store.as_ref(), &key, state.read_policy).await {
            Ok(Some(value)) => match ClientRecord::from_value(&value) {
                Some(record) => (Some(record.failed_attempts), None),
                None => (None, Some(format!("malformed record: {}", value))),
            },
            Ok(None) => (None, None),
            Err(e) => (None, Some(e.to_string())),
        };

    Ok(Json(ClientView {
        identity: key,
        failed_attempts,
        max_attempts,
        blocked: failed_attempts.unwrap_or(0) >= u64::from(max_attempts),
        read_error,
    }))
}
