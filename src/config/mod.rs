//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ThrottleConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps the throttle policy atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Store backend and read budget are process-wide and not hot-reloaded

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, IdentityConfig, ListenerConfig, LogFormat, MissingIdentityPolicy, ObservabilityConfig,
    RouteConfig, StoreBackend, StoreConfig, ThrottleConfig, ThrottleSettings, TimeoutConfig, UpstreamConfig,
};
