//! The interface an execution engine implements to be driven by [`Vm`].
//!
//! [`Vm`]: crate::vm::Vm

use std::fmt;

use callgate_primitives::Checksum;

use crate::callbacks::Capabilities;
use crate::error::EngineError;

/// Contract entry points. The names are the exports the engine calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Instantiate,
    Handle,
    Migrate,
    Query,
}

impl EntryPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instantiate => "instantiate",
            Self::Handle => "handle",
            Self::Migrate => "migrate",
            Self::Query => "query",
        }
    }

    /// Whether the entry point receives the JSON `Env` besides its message.
    pub fn takes_env(self) -> bool {
        !matches!(self, Self::Query)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invocation request.
#[derive(Debug, Clone, Copy)]
pub struct EntryCall<'a> {
    pub entry: EntryPoint,
    pub checksum: &'a Checksum,
    /// JSON `Env`, absent for `query`.
    pub env: Option<&'a [u8]>,
    pub msg: &'a [u8],
}

/// What an engine reports for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    /// Raw JSON result envelope written by the contract.
    pub result: Result<Vec<u8>, EngineError>,
    /// Total gas used, including gas reported by host callbacks.
    pub gas_used: u64,
}

/// An execution engine.
///
/// `call` must only use the capabilities it received while it runs. It
/// must charge the gas reported by every callback and stop the invocation
/// on every callback failure except a user error.
pub trait Engine {
    /// Store code and return its checksum.
    fn save_code(&self, wasm: &[u8]) -> Result<Checksum, EngineError>;

    fn load_code(&self, checksum: &Checksum) -> Result<Vec<u8>, EngineError>;

    fn call(&self, call: EntryCall<'_>, caps: Capabilities<'_>, gas_limit: u64) -> EngineReport;
}
