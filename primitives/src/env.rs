//! Execution environment passed to every contract entry point.
//!
//! `Env` contains only trusted data. It is JSON-encoded into the `params`
//! buffer of `instantiate`, `handle` and `migrate`.

use serde::{Deserialize, Serialize};

use crate::types::{Coin, HumanAddr};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    pub block: BlockInfo,
    pub message: MessageInfo,
    pub contract: ContractInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Height of the block this call is executed in.
    pub height: u64,
    /// Seconds since the unix epoch.
    pub time: u64,
    pub chain_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub sender: HumanAddr,
    /// Always serialised, as `[]` when nothing was sent.
    #[serde(default)]
    pub sent_funds: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub address: HumanAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_info_handles_multiple_coins() {
        let info = MessageInfo {
            sender: "foobar".into(),
            sent_funds: vec![Coin::new(12345, "peth"), Coin::new(789876, "uatom")],
        };
        let bz = serde_json::to_vec(&info).unwrap();
        let back: MessageInfo = serde_json::from_slice(&bz).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_message_info_handles_missing_coins() {
        let info = MessageInfo {
            sender: "baz".into(),
            sent_funds: vec![],
        };
        let bz = serde_json::to_vec(&info).unwrap();
        let back: MessageInfo = serde_json::from_slice(&bz).unwrap();
        assert_eq!(back, info);

        let raw: serde_json::Value = serde_json::from_slice(&bz).unwrap();
        assert_eq!(raw["sent_funds"], serde_json::json!([]));
    }

    #[test]
    fn test_message_info_accepts_absent_funds() {
        let info: MessageInfo = serde_json::from_str(r#"{"sender":"baz"}"#).unwrap();
        assert!(info.sent_funds.is_empty());
    }

    #[test]
    fn test_env_layout() {
        let env = Env {
            block: BlockInfo {
                height: 12_345,
                time: 1_571_797_419,
                chain_id: "testing".into(),
            },
            message: MessageInfo {
                sender: "creator".into(),
                sent_funds: vec![],
            },
            contract: ContractInfo {
                address: "contract".into(),
            },
        };
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["block"]["chain_id"], "testing");
        assert_eq!(value["message"]["sender"], "creator");
        assert_eq!(value["contract"]["address"], "contract");
    }
}
