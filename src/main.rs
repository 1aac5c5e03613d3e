//! 2FA attempt throttle.
//!
//! A reverse proxy in front of an authentication origin that counts failed
//! 2FA attempts per client in an external key-value store and rejects
//! clients that reached their limit.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ request id ─▶ throttle gate ─▶ forward ────┼──▶ Origin
//!                           │                      │                        │
//!                           │                 bounded read                  │
//!                           │                      ▼                        │
//!                           │                ┌──────────┐                   │
//!                           │                │ KV store │                   │
//!                           │                └──────────┘                   │
//!                           │                      ▲                        │
//!                           │               fire-and-forget                 │
//!     Client Response       │                      │                        │
//!     ◀─────────────────────┼──────────────── outcome recorder ◀────────────┼─── Origin
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use twofa_throttle::config::{load_config, ThrottleConfig};
use twofa_throttle::lifecycle;
use twofa_throttle::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "twofa-throttle", version, about = "Throttle repeated failed 2FA attempts per client")]
struct Args {
    /// TOML configuration file. Watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ThrottleConfig::default(),
    };

    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        default_max_attempts = config.throttle.default_max_attempts,
        read_timeout_ms = config.store.read_timeout_ms,
        "twofa-throttle starting"
    );

    if !config.throttle.identity.substitute_colons {
        tracing::warn!(
            "IPv6 client addresses are not store-safe without throttle.identity.substitute_colons; \
             such clients will not be throttled"
        );
    }

    lifecycle::run(config, args.config.as_deref()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
