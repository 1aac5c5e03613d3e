//! Timeout enforcement.
//!
//! # Responsibilities
//! - Track a single deadline across several attempts
//!
//! # Design Decisions
//! - Uses Tokio's clock so paused-time tests behave
//! - An elapsed deadline has zero time remaining, never a negative amount

use std::time::Duration;
use tokio::time::Instant;

/// A fixed point in time that a multi-attempt operation must finish by.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining().is_zero()
    }
}
