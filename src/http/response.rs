//! Responses generated by the throttle itself.
//!
//! The 403 rejection is the one externally visible protocol artifact and its
//! bytes are fixed. Responses the proxy makes up when the origin is
//! unreachable carry an [`OriginUnavailable`] marker so they are never
//! counted as failed 2FA attempts.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};

/// Content type of every JSON error the throttle emits.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Body of the threshold rejection.
pub const TOO_MANY_FAILURES_BODY: &str = r#"{"error": "too many failed 2FA codes"}"#;

pub const MISSING_CLIENT_ADDRESS_BODY: &str = r#"{"error": "missing client address"}"#;

pub const ORIGIN_UNAVAILABLE_BODY: &str = r#"{"error": "authentication origin unavailable"}"#;

/// Response extension marking a proxy-generated gateway error.
#[derive(Debug, Clone, Copy)]
pub struct OriginUnavailable;

fn json_error(status: StatusCode, body: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    response
}

/// 403 returned once a client reached its failure threshold.
pub fn too_many_failures() -> Response {
    json_error(StatusCode::FORBIDDEN, TOO_MANY_FAILURES_BODY)
}

/// 400 for transactions without a client address under the reject policy.
pub fn missing_client_address() -> Response {
    json_error(StatusCode::BAD_REQUEST, MISSING_CLIENT_ADDRESS_BODY)
}

/// 502 when no response could be obtained from the origin.
pub fn origin_unavailable() -> Response {
    let mut response = json_error(StatusCode::BAD_GATEWAY, ORIGIN_UNAVAILABLE_BODY);
    response.extensions_mut().insert(OriginUnavailable);
    response
}
