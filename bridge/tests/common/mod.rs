//! Shared test helpers for the bridge integration tests.
//!
//! Provides a closure-driven engine, a gas tally that charges callback gas
//! the way an engine does, and a host fixture with gas-charging storage.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use callgate_bridge::{
    BackendError, BackendResult, Capabilities, Deps, Engine, EngineError, EngineReport, EntryCall,
    Frame, FrameContext, FrameStorage,
};
use callgate_hostapi::{
    AddressApi, GasConfig, GasMeter, HostGasMeter, MemStore, MockApi, MockQuerier, Querier, Storage,
};
use callgate_primitives::Checksum;

// ── Engine ──

type Script = dyn Fn(EntryCall<'_>, Capabilities<'_>, u64) -> EngineReport + Send + Sync;

/// Engine whose "contract" is a Rust closure. Code blobs are kept in memory
/// and only used for checksums.
pub struct ScriptEngine {
    codes: Mutex<HashMap<Checksum, Vec<u8>>>,
    script: Box<Script>,
}

impl ScriptEngine {
    pub fn new(
        script: impl Fn(EntryCall<'_>, Capabilities<'_>, u64) -> EngineReport + Send + Sync + 'static,
    ) -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
            script: Box::new(script),
        }
    }
}

impl Engine for ScriptEngine {
    fn save_code(&self, wasm: &[u8]) -> Result<Checksum, EngineError> {
        if wasm.is_empty() {
            return Err(EngineError::InvalidCode("empty code".into()));
        }
        let checksum = Checksum::generate(wasm);
        self.codes.lock().unwrap().insert(checksum, wasm.to_vec());
        Ok(checksum)
    }

    fn load_code(&self, checksum: &Checksum) -> Result<Vec<u8>, EngineError> {
        self.codes
            .lock()
            .unwrap()
            .get(checksum)
            .cloned()
            .ok_or_else(|| EngineError::CodeNotFound(checksum.to_hex()))
    }

    fn call(&self, call: EntryCall<'_>, caps: Capabilities<'_>, gas_limit: u64) -> EngineReport {
        (self.script)(call, caps, gas_limit)
    }
}

pub const CODE: &[u8] = b"\0asm script contract";

pub fn ok_report(body: &[u8], gas_used: u64) -> EngineReport {
    EngineReport {
        result: Ok(body.to_vec()),
        gas_used,
    }
}

/// Adds up the gas reported by callbacks.
#[derive(Debug, Default)]
pub struct Tally {
    pub used: u64,
}

impl Tally {
    pub fn charge<T>(&mut self, (result, gas): BackendResult<T>) -> Result<T, BackendError> {
        self.used += gas.cost;
        result
    }
}

// ── Host ──

/// Host capabilities with storage charging a shared, unlimited meter.
pub struct Host {
    pub meter: Arc<HostGasMeter>,
    pub store: MemStore,
    pub api: MockApi,
    pub querier: MockQuerier,
}

impl Host {
    pub fn new() -> Self {
        let meter = Arc::new(HostGasMeter::unlimited());
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

    /// Run `f` against callback tables bound to a fresh frame.
    pub fn with_caps<R>(&mut self, f: impl FnOnce(Capabilities<'_>) -> R) -> R {
        with_capabilities(&mut self.store, &*self.meter, &self.api, &self.querier, f)
    }
}

/// Bind arbitrary host objects into callback tables for one frame, without
/// going through an engine.
pub fn with_capabilities<R>(
    storage: &mut dyn Storage,
    gas_meter: &dyn GasMeter,
    api: &dyn AddressApi,
    querier: &dyn Querier,
    f: impl FnOnce(Capabilities<'_>) -> R,
) -> R {
    let frame = Frame::begin();
    let mut context = FrameContext::new(
        FrameStorage::new(frame.id(), storage),
        gas_meter,
        api,
        querier,
    );
    f(context.capabilities())
}

/// Drain a scan, returning the keys and values as strings.
pub fn drain(it: &mut callgate_bridge::HostIterator<'_>, tally: &mut Tally) -> Vec<(String, String)> {
    let mut out = Vec::new();
    while let Some((k, v)) = tally.charge(it.next()).unwrap() {
        out.push((
            String::from_utf8(k).unwrap(),
            String::from_utf8(v).unwrap(),
        ));
    }
    out
}
