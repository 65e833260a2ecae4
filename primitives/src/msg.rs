//! Result envelopes returned by contract entry points.
//!
//! The engine hands these back as raw JSON bytes. Hosts decode them with
//! [`ContractResult::from_slice`] after the call returned.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::StdError;
use crate::types::{Binary, Coin, HumanAddr};

/// `{"Ok": T}` on success, `{"Err": StdError}` when the contract rejected the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractResult<T> {
    Ok(T),
    Err(StdError),
}

impl<T> ContractResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn into_result(self) -> Result<T, StdError> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(e) => Err(e),
        }
    }
}

impl<T: DeserializeOwned> ContractResult<T> {
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl<T> From<Result<T, StdError>> for ContractResult<T> {
    fn from(r: Result<T, StdError>) -> Self {
        match r {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Err(e),
        }
    }
}

pub type InitResult = ContractResult<InitResponse>;
pub type HandleResult = ContractResult<HandleResponse>;
pub type MigrateResult = ContractResult<MigrateResponse>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    /// Messages the contract asks the host to dispatch.
    pub messages: Vec<CosmosMsg>,
    pub log: Vec<LogAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleResponse {
    pub messages: Vec<CosmosMsg>,
    /// Returned to the transaction sender as the result data.
    #[serde(default)]
    pub data: Option<Binary>,
    pub log: Vec<LogAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateResponse {
    pub messages: Vec<CosmosMsg>,
    #[serde(default)]
    pub data: Option<Binary>,
    pub log: Vec<LogAttribute>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogAttribute {
    pub key: String,
    pub value: String,
}

pub fn log(key: impl Into<String>, value: impl ToString) -> LogAttribute {
    LogAttribute {
        key: key.into(),
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmosMsg {
    Bank(BankMsg),
    Wasm(WasmMsg),
    Custom(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankMsg {
    Send {
        from_address: HumanAddr,
        to_address: HumanAddr,
        amount: Vec<Coin>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasmMsg {
    Execute {
        contract_addr: HumanAddr,
        msg: Binary,
        send: Vec<Coin>,
    },
    Instantiate {
        code_id: u64,
        msg: Binary,
        send: Vec<Coin>,
        #[serde(default)]
        label: Option<String>,
    },
}
