//! Query requests a contract may send to the host, and the two-level
//! result envelope they come back in.
//!
//! The outer level ([`SystemResult`]) reports whether the query system could
//! serve the request at all. The inner level ([`QueryResponse`]) is the
//! answer of whatever was queried, which may itself be a contract error.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, SystemError};
use crate::msg::ContractResult;
use crate::types::{Binary, Coin, HumanAddr};

/// Response of a successful query, or the contract-level error it produced.
pub type QueryResponse = ContractResult<Binary>;

/// `{"Ok": T}` or `{"Err": SystemError}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemResult<T> {
    Ok(T),
    Err(SystemError),
}

impl<T> SystemResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn into_result(self) -> Result<T, SystemError> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
        }
    }
}

pub type QuerierResult = SystemResult<QueryResponse>;

/// Lift a host querier return value into the wire envelope.
///
/// System errors stay on the outer level; application errors are nested
/// inside a successful system result.
pub fn to_querier_result(res: Result<Vec<u8>, QueryError>) -> QuerierResult {
    match res {
        Ok(bz) => SystemResult::Ok(ContractResult::Ok(Binary(bz))),
        Err(QueryError::Std(e)) => SystemResult::Ok(ContractResult::Err(e)),
        Err(QueryError::System(e)) => SystemResult::Err(e),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRequest {
    Bank(BankQuery),
    Staking(StakingQuery),
    Wasm(WasmQuery),
    Custom(serde_json::Value),
}

impl QueryRequest {
    /// Short name of the request family, used in `UnsupportedRequest`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bank(_) => "bank",
            Self::Staking(_) => "staking",
            Self::Wasm(_) => "wasm",
            Self::Custom(_) => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankQuery {
    Balance { address: HumanAddr, denom: String },
    AllBalances { address: HumanAddr },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingQuery {
    Validators {},
    AllDelegations { delegator: HumanAddr },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasmQuery {
    Smart { contract_addr: HumanAddr, msg: Binary },
    Raw { contract_addr: HumanAddr, key: Binary },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub amount: Coin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllBalancesResponse {
    #[serde(default)]
    pub amount: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub address: HumanAddr,
    /// Decimal strings, e.g. `"0.05"`.
    pub commission: String,
    pub max_commission: String,
    pub max_change_rate: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorsResponse {
    #[serde(default)]
    pub validators: Vec<Validator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: HumanAddr,
    pub validator: HumanAddr,
    pub amount: Coin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllDelegationsResponse {
    #[serde(default)]
    pub delegations: Vec<Delegation>,
}
