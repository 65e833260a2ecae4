//! Top-level entry points.
//!
//! `Vm` drives an [`Engine`] through one contract invocation:
//!
//! 1. Begin a frame
//! 2. Bind the host's storage, gas meter, address API and querier into
//!    callback tables for that frame
//! 3. Call the engine, catching any unwinding out of it
//! 4. End the frame, releasing every iterator the invocation opened
//! 5. Map engine failures to [`VmError`]
//!
//! Queries issued by the contract may re-enter the `Vm` through the host's
//! querier. Each nested invocation gets its own frame.

use std::panic::{self, AssertUnwindSafe};

use callgate_hostapi::{AddressApi, GasMeter, OutOfGas, Querier, Storage};
use callgate_primitives::{Checksum, ContractResult};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::callbacks::{FrameContext, FrameStorage};
use crate::classify::panic_message;
use crate::engine::{Engine, EntryCall, EntryPoint};
use crate::error::VmError;
use crate::frame::Frame;

/// The host capabilities one invocation runs against.
pub struct Deps<'a> {
    pub storage: &'a mut dyn Storage,
    pub gas_meter: &'a dyn GasMeter,
    pub api: &'a dyn AddressApi,
    pub querier: &'a dyn Querier,
}

/// Result of one entry point invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// The contract's raw JSON result envelope.
    pub result: Result<Vec<u8>, VmError>,
    pub gas_used: u64,
}

impl ExecutionReport {
    /// Decode the result envelope, e.g. into a `HandleResult`.
    pub fn contract_result<T: DeserializeOwned>(&self) -> Result<ContractResult<T>, VmError> {
        let bz = self.result.as_ref().map_err(Clone::clone)?;
        ContractResult::from_slice(bz)
            .map_err(|e| VmError::Message(format!("cannot parse contract result: {}", e)))
    }
}

pub struct Vm<E> {
    engine: E,
}

impl<E: Engine> Vm<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Store code. Returns the checksum later invocations refer to it by.
    pub fn create(&self, wasm: &[u8]) -> Result<Checksum, VmError> {
        Ok(self.engine.save_code(wasm)?)
    }

    pub fn get_code(&self, checksum: &Checksum) -> Result<Vec<u8>, VmError> {
        Ok(self.engine.load_code(checksum)?)
    }

    pub fn instantiate(
        &self,
        checksum: &Checksum,
        env: &[u8],
        msg: &[u8],
        deps: Deps<'_>,
        gas_limit: u64,
    ) -> ExecutionReport {
        self.call(EntryPoint::Instantiate, checksum, Some(env), msg, deps, gas_limit)
    }

    pub fn handle(
        &self,
        checksum: &Checksum,
        env: &[u8],
        msg: &[u8],
        deps: Deps<'_>,
        gas_limit: u64,
    ) -> ExecutionReport {
        self.call(EntryPoint::Handle, checksum, Some(env), msg, deps, gas_limit)
    }

    pub fn migrate(
        &self,
        checksum: &Checksum,
        env: &[u8],
        msg: &[u8],
        deps: Deps<'_>,
        gas_limit: u64,
    ) -> ExecutionReport {
        self.call(EntryPoint::Migrate, checksum, Some(env), msg, deps, gas_limit)
    }

    pub fn query(
        &self,
        checksum: &Checksum,
        msg: &[u8],
        deps: Deps<'_>,
        gas_limit: u64,
    ) -> ExecutionReport {
        self.call(EntryPoint::Query, checksum, None, msg, deps, gas_limit)
    }

    fn call(
        &self,
        entry: EntryPoint,
        checksum: &Checksum,
        env: Option<&[u8]>,
        msg: &[u8],
        deps: Deps<'_>,
        gas_limit: u64,
    ) -> ExecutionReport {
        let frame = Frame::begin();
        let mut context = FrameContext::new(
            FrameStorage::new(frame.id(), deps.storage),
            deps.gas_meter,
            deps.api,
            deps.querier,
        );
        let call = EntryCall {
            entry,
            checksum,
            env,
            msg,
        };

        debug!(frame = frame.id(), %entry, %checksum, gas_limit, "calling engine");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.engine.call(call, context.capabilities(), gas_limit)
        }));

        let report = match outcome {
            Ok(report) => ExecutionReport {
                result: report.result.map_err(VmError::from),
                gas_used: report.gas_used,
            },
            Err(payload) => {
                let err = if payload.downcast_ref::<OutOfGas>().is_some() {
                    VmError::OutOfGas
                } else {
                    error!(%entry, panic = %panic_message(&*payload), "panic in engine");
                    VmError::Panic
                };
                // nothing is known about partial consumption
                ExecutionReport {
                    result: Err(err),
                    gas_used: gas_limit,
                }
            }
        };
        debug!(frame = frame.id(), %entry, gas_used = report.gas_used, ok = report.result.is_ok(), "engine returned");
        report
    }
}
