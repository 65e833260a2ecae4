//! `callgate-hostapi`: host capability traits and reference implementations.
//!
//! This crate defines the host side of the bridge. It provides:
//!
//! - `Storage` / `KvIterator`: key/value storage with range scans
//! - `GasMeter`: the read-only meter view the bridge measures deltas on
//! - `HostGasMeter`: limit-enforcing meter for the reference capabilities
//! - `AddressApi` and `Querier`: address translation and cross-module queries
//! - `MemStore`, `MockApi`, `MockQuerier`: in-memory implementations for testing
//! - `GasConfig`: per-operation costs of the reference capabilities
//! - `HostError` and the `OutOfGas` panic payload

pub mod error;
pub mod types;
pub mod gas_meter;
pub mod storage;
pub mod mem_store;
pub mod traits;
pub mod mock;

// Re-export commonly used types at the crate root.
pub use error::{panic_out_of_gas, HostError, OutOfGas};
pub use types::GasConfig;
pub use gas_meter::{GasMeter, HostGasMeter};
pub use storage::{KvIterator, Order, Record, Storage};
pub use mem_store::MemStore;
pub use traits::{AddressApi, Querier};
pub use mock::{MockApi, MockQuerier};
