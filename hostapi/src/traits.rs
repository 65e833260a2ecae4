//! Host capability traits besides storage.
//!
//! These work with Rust slices and types, not raw pointers. Buffer handling
//! and outcome classification happen in the bridge.

use callgate_primitives::{QueryError, QueryRequest};

use crate::error::HostError;

/// Address translation between the human readable and canonical forms.
///
/// Both directions report the gas they cost next to the result, including
/// when they fail. An `Err` is a problem with the caller's input and is
/// returned to the contract.
pub trait AddressApi {
    fn humanize(&self, canonical: &[u8]) -> (Result<String, HostError>, u64);

    fn canonicalize(&self, human: &str) -> (Result<Vec<u8>, HostError>, u64);
}

/// Cross-module queries.
///
/// The bridge reads [`Querier::gas_consumed`] around every call to
/// [`Querier::query`] and charges the difference to the caller.
pub trait Querier {
    /// Serve a parsed request. `gas_limit` is what the caller can still
    /// afford; an implementation may exceed it, the bridge will notice.
    fn query(&self, request: &QueryRequest, gas_limit: u64) -> Result<Vec<u8>, QueryError>;

    fn gas_consumed(&self) -> u64;
}
