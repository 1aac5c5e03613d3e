//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the throttle.
//! All types derive Serde traits for deserialization from config files.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

/// Root configuration for the 2FA throttle.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The authentication origin requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// External key-value store holding failure counters.
    pub store: StoreConfig,

    /// Attempt counting policy.
    pub throttle: ThrottleSettings,

    /// Routes whose transactions are throttled. Empty means every request.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Authentication origin.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Maximum request body forwarded to the origin, in bytes.
    pub max_body_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration for the request path.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout to the origin in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Which store implementation backs the failure counters.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map. Counters are lost on restart.
    #[default]
    Memory,
    /// Remote REST key-value service.
    Http,
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Base URL of the REST store (http backend only).
    pub endpoint: String,

    /// Namespace segment of every key URL.
    pub namespace: String,

    /// Group segment of every key URL.
    pub group: String,

    /// Optional bearer token for the REST store.
    pub auth_token: Option<String>,

    /// Total budget for one read, retries included, in milliseconds.
    pub read_timeout_ms: u64,

    /// Retries after a transient read timeout.
    pub retries_on_timeout: u32,

    /// Delay before a write becomes visible (memory backend only).
    pub propagation_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            endpoint: "http://127.0.0.1:8600".to_string(),
            namespace: "twofa".to_string(),
            group: "failures".to_string(),
            auth_token: None,
            read_timeout_ms: 500,
            retries_on_timeout: 2,
            propagation_delay_ms: 0,
        }
    }
}

/// What to do when the client-IP signal is missing or empty.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingIdentityPolicy {
    /// Count the transaction against a shared sentinel key.
    #[default]
    Sentinel,
    /// Answer 400 without contacting the store or the origin.
    Reject,
}

/// Client identity derivation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct IdentityConfig {
    /// Also replace ':' with '-' so IPv6 addresses become store-safe keys.
    pub substitute_colons: bool,

    pub on_missing: MissingIdentityPolicy,

    /// Key used for transactions without a client address.
    pub sentinel_key: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            substitute_colons: false,
            on_missing: MissingIdentityPolicy::Sentinel,
            sentinel_key: "unknown-client".to_string(),
        }
    }
}

/// Attempt counting policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ThrottleSettings {
    /// Enable throttling. When false every request is forwarded untouched.
    pub enabled: bool,

    /// Failures allowed before rejecting, unless overridden per transaction.
    pub default_max_attempts: u32,

    /// Header carrying the real client IP, set by a trusted upstream tier.
    pub client_ip_header: String,

    /// Header carrying the per-transaction max attempts override.
    pub max_attempts_header: String,

    /// Peers allowed to set the two headers above. Requests from any other
    /// peer are identified by their socket address and use the default limit.
    pub trusted_proxies: Vec<IpAddr>,

    pub identity: IdentityConfig,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_max_attempts: 3,
            client_ip_header: "x-real-ip".to_string(),
            max_attempts_header: "x-2fa-max-attempts".to_string(),
            trusted_proxies: vec![IpAddr::V4(Ipv4Addr::LOCALHOST), IpAddr::V6(Ipv6Addr::LOCALHOST)],
            identity: IdentityConfig::default(),
        }
    }
}

/// Route configuration selecting throttled transactions.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Host header to match (exact match).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder admin key that validation refuses when the admin API is on.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
