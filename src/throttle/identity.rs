//! Client identity derivation.
//!
//! The store forbids '.' in keys, so the dotted-decimal client address is
//! rewritten with hyphens. Nothing else is normalized: no case folding, no
//! trimming. Colons (IPv6) are kept unless `substitute_colons` is set, in
//! which case the store rejects the key and the gate fails open with a warning.

use std::fmt;

use thiserror::Error;

use crate::config::schema::{IdentityConfig, MissingIdentityPolicy};

/// Normalized store key identifying one client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("client address missing")]
    Missing,
}

/// Replace every '.' with '-'.
///
/// `"10.0.0.1"` becomes `"10-0-0-1"`. An empty input yields an empty key.
pub fn normalize(raw: &str) -> String {
    raw.replace('.', "-")
}

/// [`normalize`], optionally also replacing ':' with '-'.
pub fn normalize_with(raw: &str, substitute_colons: bool) -> String {
    if substitute_colons {
        raw.replace(['.', ':'], "-")
    } else {
        normalize(raw)
    }
}

/// Derive the identity for a transaction from its client-IP signal.
pub fn resolve(raw: Option<&str>, config: &IdentityConfig) -> Result<ClientIdentity, IdentityError> {
    match raw.filter(|s| !s.is_empty()) {
        Some(raw) => Ok(ClientIdentity(normalize_with(raw, config.substitute_colons))),
        None => match config.on_missing {
            MissingIdentityPolicy::Sentinel => Ok(ClientIdentity(config.sentinel_key.clone())),
            MissingIdentityPolicy::Reject => Err(IdentityError::Missing),
        },
    }
}
