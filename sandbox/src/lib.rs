//! `callgate-sandbox`: Wasmtime-based contract engine for the callgate bridge.
//!
//! Stores, validates and runs wasm contracts behind the bridge's `Engine`
//! trait. It enforces:
//!
//! - **Determinism:** No SIMD, no threads, NaN canonicalization
//! - **Gas metering:** Fuel is gas; host callback gas is deducted from fuel
//! - **Memory limits:** Bounded linear memory growth
//! - **Import whitelisting:** Only the `env` host functions, no WASI
//! - **ABI validation:** Entry exports and required features checked on save
//!
//! The primary entry point is [`WasmEngine`], driven through
//! `callgate_bridge::Vm`.

pub mod error;
pub mod config;
pub mod memory;
pub mod host_impl;
pub mod validation;
pub mod linker;
pub mod runtime;

pub use config::{features_from_csv, SandboxConfig};
pub use error::SandboxError;
pub use runtime::WasmEngine;
