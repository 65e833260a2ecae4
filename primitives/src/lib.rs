//! `callgate-primitives`: shared types for the callgate host/engine bridge.
//!
//! This crate provides the outcome codes that cross every callback, the JSON
//! envelopes exchanged with contracts (environment, results, queries), the
//! code checksum, and the gas cost table used by the reference host.

pub mod outcome;
pub mod types;
pub mod error;
pub mod env;
pub mod msg;
pub mod query;
pub mod gas;

// Re-export commonly used types at the crate root for convenience.
pub use outcome::Outcome;
pub use types::{Binary, CanonicalAddr, Checksum, ChecksumLengthError, Coin, HumanAddr, CHECKSUM_LEN};
pub use error::{QueryError, StdError, SystemError};
pub use env::{BlockInfo, ContractInfo, Env, MessageInfo};
pub use msg::{
    log, BankMsg, ContractResult, CosmosMsg, HandleResponse, HandleResult, InitResponse,
    InitResult, LogAttribute, MigrateResponse, MigrateResult, WasmMsg,
};
pub use query::{
    to_querier_result, BankQuery, QuerierResult, QueryRequest, QueryResponse, StakingQuery,
    SystemResult, WasmQuery,
};
