//! Routing subsystem: which transactions the throttle applies to.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (route lookup in priority order)
//!     → matcher.rs (evaluate match conditions)
//!     → throttled or passthrough
//!
//! Route Compilation (startup and reload):
//!     RouteConfig[]
//!     → Sort by priority
//!     → Compile matchers
//!     → Freeze as immutable RouteTable
//! ```

pub mod matcher;
pub mod router;

pub use router::RouteTable;
