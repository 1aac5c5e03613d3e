//! Admin API.
//!
//! Read-only view of the running throttle on its own listener, behind a
//! bearer token. There is deliberately no endpoint that resets a counter.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::store::ReadPolicy;
use crate::throttle::ThrottleState;

use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub throttle: Arc<ThrottleState>,
    pub api_key: String,
    pub read_policy: ReadPolicy,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/policy", get(get_policy))
        .route("/admin/clients/{ip}", get(get_client))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
