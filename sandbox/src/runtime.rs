//! Wasmtime engine, code store, and entry point execution.
//!
//! [`WasmEngine`] implements the bridge's `Engine` trait. Code is validated
//! and compiled once in `save_code`, persisted under `base_dir/wasm` and
//! kept in an LRU cache of compiled modules. Every call runs in a fresh
//! instance with its own store, so nothing survives between invocations.
//!
//! Gas is wasmtime fuel. The fuel left when the call returns gives the gas
//! used, which therefore includes what host callbacks charged.

use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Mutex;

use lru::LruCache;
use tracing::debug;
use wasmtime::{Config, Instance, Linker, Memory, Module, Store, Trap};

use callgate_bridge::{Capabilities, EngineError, EngineReport, EntryCall, EntryPoint};
use callgate_primitives::Checksum;

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::host_impl::GuestState;
use crate::linker::register_host_functions;
use crate::memory;
use crate::validation::validate_module;

/// Status a contract returns when it wrote a result.
const STATUS_OK: i32 = 0;

/// Wasm contract engine with an on-disk code store.
pub struct WasmEngine {
    engine: wasmtime::Engine,
    config: SandboxConfig,
    wasm_dir: PathBuf,
    cache: Mutex<LruCache<Checksum, Module>>,
}

impl WasmEngine {
    /// Open (or create) the code store under `config.base_dir`.
    pub fn new(config: SandboxConfig) -> Result<Self, SandboxError> {
        let engine = create_engine(&config)?;
        let wasm_dir = config.base_dir.join("wasm");
        fs::create_dir_all(&wasm_dir)?;
        let capacity =
            NonZeroUsize::new(config.memory_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        debug!(dir = %wasm_dir.display(), capacity = capacity.get(), "code store opened");
        Ok(Self {
            engine,
            config,
            wasm_dir,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Number of compiled modules currently held in memory.
    pub fn cached_modules(&self) -> usize {
        self.lock_cache().len()
    }

    /// Validate, compile and persist a contract.
    pub fn store_code(&self, wasm: &[u8]) -> Result<Checksum, SandboxError> {
        let module = Module::new(&self.engine, wasm)?;
        validate_module(&module, &self.config.supported_features)?;
        let checksum = Checksum::generate(wasm);
        fs::write(self.code_path(&checksum), wasm)?;
        self.lock_cache().put(checksum, module);
        debug!(%checksum, size = wasm.len(), "code stored");
        Ok(checksum)
    }

    /// Read stored code back, checking it still hashes to `checksum`.
    pub fn read_code(&self, checksum: &Checksum) -> Result<Vec<u8>, SandboxError> {
        let wasm = match fs::read(self.code_path(checksum)) {
            Ok(wasm) => wasm,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SandboxError::CodeNotFound(checksum.to_hex()));
            }
            Err(e) => return Err(e.into()),
        };
        let actual = Checksum::generate(&wasm);
        if actual != *checksum {
            return Err(SandboxError::ChecksumMismatch {
                expected: checksum.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(wasm)
    }

    fn code_path(&self, checksum: &Checksum) -> PathBuf {
        self.wasm_dir.join(format!("{}.wasm", checksum.to_hex()))
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<Checksum, Module>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The compiled module for `checksum`, from memory or from disk.
    fn module(&self, checksum: &Checksum) -> Result<Module, SandboxError> {
        if let Some(module) = self.lock_cache().get(checksum) {
            return Ok(module.clone());
        }
        let wasm = self.read_code(checksum)?;
        let module = Module::new(&self.engine, &wasm)?;
        validate_module(&module, &self.config.supported_features)?;
        self.lock_cache().put(*checksum, module.clone());
        debug!(%checksum, "module compiled from code store");
        Ok(module)
    }

    fn run(&self, store: &mut Store<GuestState>, call: EntryCall<'_>) -> Result<Vec<u8>, EngineError> {
        let module = self.module(call.checksum)?;

        let mut linker = Linker::new(&self.engine);
        register_host_functions(&mut linker)?;
        let instance = linker
            .instantiate(&mut *store, &module)
            .map_err(|e| handle_trap(store, e))?;

        let memory = instance
            .get_memory(&mut *store, "memory")
            .ok_or_else(|| EngineError::Runtime("no memory export".into()))?;
        memory::init_host_region(&memory, &mut *store).map_err(guest_fault)?;

        let msg_ptr = write_input(&memory, store, call.msg)?;
        let out_ptr = memory::alloc_and_write(&memory, &mut *store, &[0u8; 8]).map_err(guest_fault)?;
        let out_len = out_ptr + 4;

        let status = match call.entry {
            EntryPoint::Query => invoke(
                store,
                &instance,
                call.entry,
                (msg_ptr, len_of(call.msg)?, out_ptr, out_len),
            )?,
            entry => {
                let env = call.env.unwrap_or_default();
                let env_ptr = write_input(&memory, store, env)?;
                invoke(
                    store,
                    &instance,
                    entry,
                    (env_ptr, len_of(env)?, msg_ptr, len_of(call.msg)?, out_ptr, out_len),
                )?
            }
        };
        if status != STATUS_OK {
            return Err(EngineError::Runtime(format!(
                "{} returned {}",
                call.entry, status
            )));
        }

        let data = memory.data(&*store);
        let result_ptr = memory::read_i32(data, out_ptr).map_err(guest_fault)?;
        let result_len = memory::read_i32(data, out_len).map_err(guest_fault)?;
        memory::read_optional(data, result_ptr, result_len)
            .map_err(guest_fault)?
            .ok_or_else(|| EngineError::Runtime(format!("{} returned no result", call.entry)))
    }
}

impl callgate_bridge::Engine for WasmEngine {
    fn save_code(&self, wasm: &[u8]) -> Result<Checksum, EngineError> {
        Ok(self.store_code(wasm)?)
    }

    fn load_code(&self, checksum: &Checksum) -> Result<Vec<u8>, EngineError> {
        Ok(self.read_code(checksum)?)
    }

    fn call(&self, call: EntryCall<'_>, caps: Capabilities<'_>, gas_limit: u64) -> EngineReport {
        // SAFETY: the tables live in `store`, which is dropped before this
        // call returns
        let (db, api, querier) = unsafe { caps.into_parts() };
        let state = GuestState::new(db, api, querier, self.config.max_memory_pages);
        let mut store = Store::new(&self.engine, state);
        store.limiter(|state| &mut state.limits);
        if let Err(e) = store.set_fuel(gas_limit) {
            return EngineReport {
                result: Err(EngineError::Internal(format!("cannot set fuel: {}", e))),
                gas_used: 0,
            };
        }

        let result = self.run(&mut store, call);
        let remaining = store.get_fuel().unwrap_or(0);
        let gas_used = gas_limit.saturating_sub(remaining);
        match &result {
            Ok(_) => debug!(
                entry = %call.entry,
                checksum = %call.checksum,
                gas_used,
                callback_gas = store.data().callback_gas,
                "wasm call finished"
            ),
            Err(e) => debug!(entry = %call.entry, gas_used, error = %e, "wasm call failed"),
        }
        EngineReport { result, gas_used }
    }
}

/// Create a Wasmtime engine with deterministic configuration.
fn create_engine(config: &SandboxConfig) -> Result<wasmtime::Engine, SandboxError> {
    let mut wasm_config = Config::new();

    // Fuel metering: fuel is gas
    wasm_config.consume_fuel(true);

    // Determinism enforcement
    wasm_config.wasm_threads(false);
    wasm_config.wasm_simd(false);
    wasm_config.wasm_relaxed_simd(false);
    wasm_config.wasm_multi_memory(false);
    wasm_config.cranelift_nan_canonicalization(true);

    let max_bytes = config.max_memory_pages as u64 * memory::WASM_PAGE_SIZE as u64;
    wasm_config.memory_guaranteed_dense_image_size(max_bytes.min(16 * 1024 * 1024));

    Ok(wasmtime::Engine::new(&wasm_config)?)
}

fn invoke<Params>(
    store: &mut Store<GuestState>,
    instance: &Instance,
    entry: EntryPoint,
    params: Params,
) -> Result<i32, EngineError>
where
    Params: wasmtime::WasmParams,
{
    let func = instance
        .get_typed_func::<Params, i32>(&mut *store, entry.as_str())
        .map_err(|e| EngineError::Runtime(format!("{:#}", e)))?;
    func.call(&mut *store, params).map_err(|e| handle_trap(store, e))
}

fn write_input(
    memory: &Memory,
    store: &mut Store<GuestState>,
    data: &[u8],
) -> Result<i32, EngineError> {
    memory::alloc_and_write(memory, &mut *store, data).map_err(guest_fault)
}

fn len_of(data: &[u8]) -> Result<i32, EngineError> {
    i32::try_from(data.len()).map_err(|_| EngineError::Runtime("input too large".into()))
}

/// Memory problems caused by what the guest did.
fn guest_fault(err: impl std::fmt::Display) -> EngineError {
    EngineError::Runtime(err.to_string())
}

/// Turn a failed guest call into the error to report.
///
/// A failure recorded by a host function wins, since the trap itself
/// only carries its message. Running out of fuel is out of gas.
fn handle_trap(store: &mut Store<GuestState>, err: anyhow::Error) -> EngineError {
    if let Some(failure) = store.data_mut().failure.take() {
        return failure;
    }
    match err.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => EngineError::OutOfGas,
        _ => EngineError::Runtime(format!("{:#}", err)),
    }
}
