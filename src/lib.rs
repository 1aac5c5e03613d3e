//! Failed 2FA attempt throttling in front of an authentication origin.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod store;
pub mod throttle;

pub use config::schema::ThrottleConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
