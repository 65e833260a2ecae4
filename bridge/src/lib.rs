//! `callgate-bridge`: the boundary between a host and a contract engine.
//!
//! The host owns storage, a gas meter, an address API and a querier. The
//! engine runs contract code and calls back into the host through C-ABI
//! function tables. This crate implements both sides of that boundary:
//!
//! - [`memory`]: buffers that transfer ownership across the boundary
//! - [`callbacks`]: the host callback tables and their `extern "C"` bodies
//! - [`backend`]: safe engine-side adapters over those tables
//! - [`frame`]: call frames and the iterators parked in them
//! - [`gas`]: gas deltas observed around host operations
//! - [`classify`]: panic and error classification into outcome codes
//! - [`engine`]: the trait an execution engine implements
//! - [`vm::Vm`]: the `instantiate` / `handle` / `migrate` / `query` entry points

pub mod memory;
pub mod error;
pub mod gas;
pub mod classify;
pub mod frame;
pub mod callbacks;
pub mod backend;
pub mod engine;
pub mod vm;

// Re-export key types for convenience
pub use backend::{BackendResult, GasInfo};
pub use callbacks::{
    ApiTable, Capabilities, DbTable, FrameContext, FrameStorage, HostIterator, IteratorHandle,
    QuerierTable,
};
pub use engine::{Engine, EngineReport, EntryCall, EntryPoint};
pub use error::{BackendError, CallbackError, EngineError, RegistryError, VmError};
pub use frame::{Frame, FrameId, FrameRegistry};
pub use memory::{release_buffer, Buffer, BufferView};
pub use vm::{Deps, ExecutionReport, Vm};
