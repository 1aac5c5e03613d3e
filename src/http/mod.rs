//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request id)
//!     → [throttle middleware: gate]
//!     → server.rs (forward to authentication origin)
//!     → [throttle middleware: recorder]
//!     → response.rs (throttle-generated responses)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id_of, X_REQUEST_ID};
pub use server::HttpServer;
