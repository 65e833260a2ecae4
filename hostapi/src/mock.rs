//! Reference address API and querier for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use callgate_primitives::query::{AllBalancesResponse, BalanceResponse};
use callgate_primitives::{BankQuery, Coin, QueryError, QueryRequest, StdError, SystemError};

use crate::error::HostError;
use crate::traits::{AddressApi, Querier};
use crate::types::GasConfig;

pub const DEFAULT_ADDR_PREFIX: &str = "cosmos1";

/// Reversible address codec: `prefix + hex(canonical)`.
#[derive(Debug, Clone)]
pub struct MockApi {
    prefix: String,
    config: GasConfig,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new(DEFAULT_ADDR_PREFIX, GasConfig::default())
    }
}

impl MockApi {
    pub fn new(prefix: impl Into<String>, config: GasConfig) -> Self {
        Self {
            prefix: prefix.into(),
            config,
        }
    }

    fn decode(&self, human: &str) -> Result<Vec<u8>, HostError> {
        let body = human
            .strip_prefix(self.prefix.as_str())
            .ok_or_else(|| HostError::user(format!("address must start with {}", self.prefix)))?;
        if body.is_empty() {
            return Err(HostError::user("address has no payload"));
        }
        hex::decode(body).map_err(|e| HostError::user(format!("invalid address payload: {}", e)))
    }
}

impl AddressApi for MockApi {
    fn humanize(&self, canonical: &[u8]) -> (Result<String, HostError>, u64) {
        let res = if canonical.is_empty() {
            Err(HostError::user("canonical address is empty"))
        } else {
            Ok(format!("{}{}", self.prefix, hex::encode(canonical)))
        };
        (res, self.config.humanize)
    }

    fn canonicalize(&self, human: &str) -> (Result<Vec<u8>, HostError>, u64) {
        (self.decode(human), self.config.canonicalize)
    }
}

/// Querier serving bank balances; every other request is unsupported.
#[derive(Debug, Default)]
pub struct MockQuerier {
    balances: HashMap<String, Vec<Coin>>,
    config: GasConfig,
    consumed: AtomicU64,
}

impl MockQuerier {
    pub fn new(config: GasConfig) -> Self {
        Self {
            balances: HashMap::new(),
            config,
            consumed: AtomicU64::new(0),
        }
    }

    pub fn with_balance(mut self, address: impl Into<String>, coins: Vec<Coin>) -> Self {
        self.balances.insert(address.into(), coins);
        self
    }

    fn bank(&self, query: &BankQuery) -> Result<Vec<u8>, QueryError> {
        let bz = match query {
            BankQuery::Balance { address, denom } => {
                let amount = self
                    .balances
                    .get(address)
                    .and_then(|coins| coins.iter().find(|c| &c.denom == denom))
                    .cloned()
                    .unwrap_or_else(|| Coin::new(0, denom.clone()));
                serde_json::to_vec(&BalanceResponse { amount })
            }
            BankQuery::AllBalances { address } => {
                let amount = self.balances.get(address).cloned().unwrap_or_default();
                serde_json::to_vec(&AllBalancesResponse { amount })
            }
        };
        bz.map_err(|e| {
            StdError::SerializeErr {
                source_type: "BankResponse".into(),
                msg: e.to_string(),
            }
            .into()
        })
    }
}

impl Querier for MockQuerier {
    fn query(&self, request: &QueryRequest, _gas_limit: u64) -> Result<Vec<u8>, QueryError> {
        self.consumed.fetch_add(self.config.query, Ordering::SeqCst);
        match request {
            QueryRequest::Bank(bank) => self.bank(bank),
            other => Err(SystemError::UnsupportedRequest {
                kind: other.kind().to_string(),
            }
            .into()),
        }
    }

    fn gas_consumed(&self) -> u64 {
        self.consumed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callgate_primitives::StakingQuery;

    #[test]
    fn test_address_round_trip() {
        let api = MockApi::default();
        let (human, cost) = api.humanize(&[0xde, 0xad, 0xbe, 0xef]);
        let human = human.unwrap();
        assert_eq!(human, "cosmos1deadbeef");
        assert_eq!(cost, GasConfig::default().humanize);

        let (canonical, _) = api.canonicalize(&human);
        assert_eq!(canonical.unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_canonicalize_rejects_bad_input() {
        let api = MockApi::default();
        assert!(matches!(api.canonicalize("foobar").0, Err(HostError::User(_))));
        assert!(matches!(api.canonicalize("cosmos1").0, Err(HostError::User(_))));
        assert!(matches!(api.canonicalize("cosmos1zz").0, Err(HostError::User(_))));
    }

    #[test]
    fn test_humanize_rejects_empty() {
        let api = MockApi::default();
        let (res, cost) = api.humanize(&[]);
        assert!(matches!(res, Err(HostError::User(_))));
        // failures are still charged
        assert_eq!(cost, GasConfig::default().humanize);
    }

    #[test]
    fn test_bank_balance() {
        let querier = MockQuerier::new(GasConfig::default())
            .with_balance("alice", vec![Coin::new(500, "ATOM")]);

        let req = QueryRequest::Bank(BankQuery::Balance {
            address: "alice".into(),
            denom: "ATOM".into(),
        });
        let bz = querier.query(&req, u64::MAX).unwrap();
        let resp: BalanceResponse = serde_json::from_slice(&bz).unwrap();
        assert_eq!(resp.amount, Coin::new(500, "ATOM"));
        assert_eq!(querier.gas_consumed(), GasConfig::default().query);

        let req = QueryRequest::Bank(BankQuery::Balance {
            address: "bob".into(),
            denom: "ATOM".into(),
        });
        let bz = querier.query(&req, u64::MAX).unwrap();
        let resp: BalanceResponse = serde_json::from_slice(&bz).unwrap();
        assert_eq!(resp.amount.amount, "0");
    }

    #[test]
    fn test_all_balances_of_unknown_is_empty_array() {
        let querier = MockQuerier::new(GasConfig::default());
        let req = QueryRequest::Bank(BankQuery::AllBalances {
            address: "nobody".into(),
        });
        let bz = querier.query(&req, u64::MAX).unwrap();
        assert_eq!(bz, br#"{"amount":[]}"#.to_vec());
    }

    #[test]
    fn test_unsupported_request() {
        let querier = MockQuerier::new(GasConfig::default());
        let err = querier
            .query(&QueryRequest::Staking(StakingQuery::Validators {}), u64::MAX)
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::System(SystemError::UnsupportedRequest {
                kind: "staking".into()
            })
        );
    }
}
