//! Contract-level and system-level error envelopes.
//!
//! `StdError` is what a contract (or a host querier acting on a contract's
//! behalf) reports as an application failure. `SystemError` is a failure
//! of the query system itself: the request never reached a contract or
//! could not be understood. Both are JSON-encoded when they cross the
//! boundary.

use serde::{Deserialize, Serialize};

use crate::types::Binary;

/// Application-level error reported by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum StdError {
    #[error("generic error: {msg}")]
    GenericErr { msg: String },
    #[error("{kind} not found")]
    NotFound { kind: String },
    #[error("error parsing into type {target}: {msg}")]
    ParseErr { target: String, msg: String },
    #[error("error serializing type {source_type}: {msg}")]
    SerializeErr { source_type: String, msg: String },
    #[error("unauthorized")]
    Unauthorized {},
}

impl StdError {
    pub fn generic_err(msg: impl Into<String>) -> Self {
        Self::GenericErr { msg: msg.into() }
    }

    pub fn not_found(kind: impl Into<String>) -> Self {
        Self::NotFound { kind: kind.into() }
    }

    pub fn parse_err(target: impl Into<String>, msg: impl ToString) -> Self {
        Self::ParseErr {
            target: target.into(),
            msg: msg.to_string(),
        }
    }
}

/// Failure of the query system, as opposed to a failure of the queried contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum SystemError {
    #[error("cannot parse request: {error}")]
    InvalidRequest { error: String, request: Binary },
    #[error("cannot parse response: {error}")]
    InvalidResponse { error: String, response: Binary },
    #[error("no such contract: {addr}")]
    NoSuchContract { addr: String },
    #[error("unknown system error")]
    Unknown {},
    #[error("unsupported query type: {kind}")]
    UnsupportedRequest { kind: String },
}

/// Error returned by a host querier implementation.
///
/// The two variants land on different levels of a
/// [`QuerierResult`](crate::query::QuerierResult).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Std(#[from] StdError),
}
