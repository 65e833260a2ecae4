//! Shared test helpers for integration tests.
//!
//! Provides WAT contract templates, host capabilities with observable gas,
//! and engine factories backed by a temporary code store.

#![allow(dead_code)]

use std::sync::Arc;

use callgate_bridge::{Deps, Vm};
use callgate_hostapi::{GasConfig, HostGasMeter, MemStore, MockApi, MockQuerier};
use callgate_primitives::{BlockInfo, ContractInfo, Env, MessageInfo};
use callgate_sandbox::{SandboxConfig, WasmEngine};

/// Gas limit large enough for every contract below.
pub const GAS_LIMIT: u64 = 10_000_000;

/// Result every template `instantiate` and `migrate` returns.
pub const INIT_RESULT: &str = r#"{"Ok":{"messages":[],"log":[]}}"#;

/// Result `handle` writes when address translation is rejected.
pub const USER_ERROR: &str = "user error";

/// Storage key `instantiate` saves its message under.
pub const CONFIG_KEY: &str = "config";

// ── Contract templates ──
//
// Guest memory layout (page 0):
//   256..272   scratch (ptr, len) slots for host outputs
//   1024       "config"
//   1056       INIT_RESULT
//   1120       "user error"
//
// handle params: 0 env, 1 env_len, 2 msg, 3 msg_len, 4 out_ptr, 5 out_len
// query params:  0 msg, 1 msg_len, 2 out_ptr, 3 out_len

/// `handle` answers with the stored value of the key in its message.
pub const READ_KEY: &str = r#"
    (call $db_read (local.get 2) (local.get 3) (local.get 4) (local.get 5))
"#;

/// `handle` writes its message under the `config` key, then reads it back.
pub const WRITE_CONFIG: &str = r#"
    (drop (call $db_write (i32.const 1024) (i32.const 6) (local.get 2) (local.get 3)))
    (call $db_read (i32.const 1024) (i32.const 6) (local.get 4) (local.get 5))
"#;

/// `handle` scans everything in the order given by its message (`"1"` or
/// `"2"`) and answers with the last key visited.
pub const SCAN_LAST_KEY: &str = r#"
    (local.set $it (call $db_scan (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0)
        (i32.sub (i32.load8_u (local.get 2)) (i32.const 48))))
    (block $done
        (loop $next
            (drop (call $db_next (local.get $it)
                (i32.const 256) (i32.const 260) (i32.const 264) (i32.const 268)))
            (br_if $done (i32.eqz (i32.load (i32.const 256))))
            (i32.store (local.get 4) (i32.load (i32.const 256)))
            (i32.store (local.get 5) (i32.load (i32.const 260)))
            (br $next)))
    (i32.const 0)
"#;

/// `handle` canonicalizes the address in its message and humanizes it
/// back. A rejected address answers with `USER_ERROR`.
pub const ADDRESS_ROUND_TRIP: &str = r#"
    (if (i32.eq (call $addr_canonicalize (local.get 2) (local.get 3)
                    (i32.const 256) (i32.const 260))
                (i32.const 1))
        (then
            (i32.store (local.get 4) (i32.const 1120))
            (i32.store (local.get 5) (i32.const 10))
            (return (i32.const 0))))
    (call $addr_humanize (i32.load (i32.const 256)) (i32.load (i32.const 260))
        (local.get 4) (local.get 5))
"#;

/// `handle` writes with a null key.
pub const NULL_KEY: &str = r#"
    (call $db_write (i32.const 0) (i32.const 0) (local.get 2) (local.get 3))
"#;

pub const SPIN: &str = r#"
    (loop $spin (br $spin))
    (i32.const 0)
"#;

pub const UNREACHABLE: &str = "(unreachable)";

/// `handle` fails with status 7 without writing a result.
pub const FAIL_STATUS: &str = "(i32.const 7)";

/// `handle` returns 3 if growing memory by 1000 pages is refused.
pub const GROW_MEMORY: &str = r#"
    (if (result i32) (i32.eq (memory.grow (i32.const 1000)) (i32.const -1))
        (then (i32.const 3))
        (else (i32.const 0)))
"#;

/// `handle` grows memory by a page, marks it, reads the key in its message
/// and answers with the 4 marker bytes.
pub const MARK_GROWN_PAGE: &str = r#"
    (local.set $it (i32.mul (memory.grow (i32.const 1)) (i32.const 65536)))
    (i32.store offset=100 (local.get $it) (i32.const 0x42424242))
    (drop (call $db_read (local.get 2) (local.get 3) (i32.const 256) (i32.const 260)))
    (i32.store (local.get 4) (i32.add (local.get $it) (i32.const 100)))
    (i32.store (local.get 5) (i32.const 4))
    (i32.const 0)
"#;

/// `handle` grows memory by a page, then answers like `READ_KEY`.
pub const GROW_THEN_READ: &str = r#"
    (drop (memory.grow (i32.const 1)))
    (call $db_read (local.get 2) (local.get 3) (local.get 4) (local.get 5))
"#;

/// `query` answers with its own message.
pub const ECHO_QUERY: &str = r#"
    (i32.store (local.get 2) (local.get 0))
    (i32.store (local.get 3) (local.get 1))
    (i32.const 0)
"#;

/// `query` forwards its message to the chain querier.
pub const CHAIN_QUERY: &str = r#"
    (call $query_chain (local.get 0) (local.get 1) (local.get 2) (local.get 3))
"#;

/// A contract with the given `handle` body and an echoing `query`.
pub fn contract(handle: &str) -> Vec<u8> {
    contract_with(handle, ECHO_QUERY, "")
}

/// A contract with the given bodies. `extra` is spliced in at module level.
pub fn contract_with(handle: &str, query: &str, extra: &str) -> Vec<u8> {
    format!(
        r#"
(module
    (import "env" "db_read" (func $db_read (param i32 i32 i32 i32) (result i32)))
    (import "env" "db_write" (func $db_write (param i32 i32 i32 i32) (result i32)))
    (import "env" "db_remove" (func $db_remove (param i32 i32) (result i32)))
    (import "env" "db_scan" (func $db_scan (param i32 i32 i32 i32 i32) (result i32)))
    (import "env" "db_next" (func $db_next (param i32 i32 i32 i32 i32) (result i32)))
    (import "env" "addr_humanize" (func $addr_humanize (param i32 i32 i32 i32) (result i32)))
    (import "env" "addr_canonicalize" (func $addr_canonicalize (param i32 i32 i32 i32) (result i32)))
    (import "env" "query_chain" (func $query_chain (param i32 i32 i32 i32) (result i32)))

    (memory (export "memory") 1)
    (data (i32.const 1024) "config")
    (data (i32.const 1056) "{{\"Ok\":{{\"messages\":[],\"log\":[]}}}}")
    (data (i32.const 1120) "user error")

    (func (export "instantiate") (param i32 i32 i32 i32 i32 i32) (result i32)
        (drop (call $db_write (i32.const 1024) (i32.const 6) (local.get 2) (local.get 3)))
        (i32.store (local.get 4) (i32.const 1056))
        (i32.store (local.get 5) (i32.const 31))
        (i32.const 0))

    (func (export "migrate") (param i32 i32 i32 i32 i32 i32) (result i32)
        (drop (call $db_remove (local.get 2) (local.get 3)))
        (i32.store (local.get 4) (i32.const 1056))
        (i32.store (local.get 5) (i32.const 31))
        (i32.const 0))

    (func (export "handle") (param i32 i32 i32 i32 i32 i32) (result i32)
        (local $it i32)
        {handle})

    (func (export "query") (param i32 i32 i32 i32) (result i32)
        {query})

    {extra}
)
"#
    )
    .into_bytes()
}

// ── Host ──

/// Host capabilities with storage charging a shared meter.
pub struct Host {
    pub meter: Arc<HostGasMeter>,
    pub store: MemStore,
    pub api: MockApi,
    pub querier: MockQuerier,
}

impl Host {
    pub fn new() -> Self {
        Self::with_meter(HostGasMeter::unlimited())
    }

    pub fn with_meter(meter: HostGasMeter) -> Self {
        let meter = Arc::new(meter);
        Self {
            store: MemStore::with_gas(meter.clone(), GasConfig::default()),
            meter,
            api: MockApi::default(),
            querier: MockQuerier::new(GasConfig::default()),
        }
    }

    pub fn seeded(pairs: &[(&str, &str)]) -> Self {
        let mut host = Self::new();
        for (k, v) in pairs {
            host.store.insert(k.as_bytes().to_vec(), v.as_bytes().to_vec());
        }
        host
    }

    pub fn deps(&mut self) -> Deps<'_> {
        Deps {
            storage: &mut self.store,
            gas_meter: &*self.meter,
            api: &self.api,
            querier: &self.querier,
        }
    }
}

// ── Engines ──

pub fn engine_in(dir: &tempfile::TempDir) -> Vm<WasmEngine> {
    engine_with(SandboxConfig::new(dir.path()))
}

pub fn engine_with(config: SandboxConfig) -> Vm<WasmEngine> {
    Vm::new(WasmEngine::new(config).unwrap())
}

pub fn env_bytes() -> Vec<u8> {
    let env = Env {
        block: BlockInfo {
            height: 12_345,
            time: 1_571_797_419,
            chain_id: "callgate-testing".into(),
        },
        message: MessageInfo {
            sender: "cosmos1deadbeef".into(),
            sent_funds: vec![],
        },
        contract: ContractInfo {
            address: "cosmos1c0ffee".into(),
        },
    };
    serde_json::to_vec(&env).unwrap()
}
