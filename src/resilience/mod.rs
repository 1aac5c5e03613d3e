//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Store read:
//!     → timeouts.rs (one deadline for the whole read)
//!     → retries.rs (retry store-reported timeouts inside what is left of it)
//!     → Err after the budget is spent; callers fail open
//! ```
//!
//! # Design Decisions
//! - Every store read has a deadline; nothing on the request path waits unbounded
//! - Retries never extend the deadline
//! - Only timeouts reported by the store are retried

pub mod retries;
pub mod timeouts;

pub use retries::retry_on_timeout;
pub use timeouts::Deadline;
