//! Host function registration via Wasmtime linker.
//!
//! Registers the `env` functions a contract may import. Each function:
//! 1. Reads its inputs out of guest memory (pointer 0 = absent)
//! 2. Calls the matching callback table through the bridge adapters
//! 3. Deducts the gas the callback reported from the store's fuel
//! 4. Writes outputs into the host region, as `(ptr, len)` pairs
//!
//! A callback failure the guest cannot handle traps. The reason is kept in
//! [`GuestState::failure`] so the runtime can report it precisely. Only
//! address translation errors are returned to the guest, as status 1.

use callgate_bridge::{BackendError, BackendResult, EngineError};
use tracing::debug;
use wasmtime::{Caller, Linker, Memory};

use crate::error::SandboxError;
use crate::host_impl::GuestState;
use crate::memory;

/// Module name every import must come from.
pub const IMPORT_MODULE: &str = "env";

/// Functions available to contracts.
pub const HOST_FUNCTIONS: &[&str] = &[
    "db_read",
    "db_write",
    "db_remove",
    "db_scan",
    "db_next",
    "addr_humanize",
    "addr_canonicalize",
    "query_chain",
];

const STATUS_OK: i32 = 0;
const STATUS_USER_ERROR: i32 = 1;

type HostResult<T> = anyhow::Result<T>;

/// Register every host function with the linker.
pub fn register_host_functions(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    register_db_read(linker)?;
    register_db_write(linker)?;
    register_db_remove(linker)?;
    register_db_scan(linker)?;
    register_db_next(linker)?;
    register_addr_humanize(linker)?;
    register_addr_canonicalize(linker)?;
    register_query_chain(linker)?;
    Ok(())
}

// ── Shared plumbing ──

/// Record why the invocation must stop and build the trap that stops it.
fn trap(caller: &mut Caller<'_, GuestState>, err: EngineError) -> anyhow::Error {
    let msg = err.to_string();
    caller.data_mut().failure = Some(err);
    anyhow::Error::msg(msg)
}

fn guest_memory(caller: &mut Caller<'_, GuestState>) -> HostResult<Memory> {
    match caller.get_export("memory").and_then(|e| e.into_memory()) {
        Some(m) => Ok(m),
        None => Err(trap(caller, EngineError::Internal("no memory export".into()))),
    }
}

fn input(
    caller: &mut Caller<'_, GuestState>,
    mem: &Memory,
    ptr: i32,
    len: i32,
) -> HostResult<Option<Vec<u8>>> {
    let read = memory::read_optional(mem.data(&*caller), ptr, len);
    read.map_err(|e| trap(caller, EngineError::Runtime(e.to_string())))
}

/// An input the callback cannot do without.
fn required(
    caller: &mut Caller<'_, GuestState>,
    mem: &Memory,
    ptr: i32,
    len: i32,
) -> HostResult<Vec<u8>> {
    match input(caller, mem, ptr, len)? {
        Some(bytes) => Ok(bytes),
        None => Err(trap(caller, BackendError::BadArgument.into())),
    }
}

/// Write `data` (or an absent marker) to the `(ptr, len)` out-slots.
fn output(
    caller: &mut Caller<'_, GuestState>,
    mem: &Memory,
    ptr_slot: i32,
    len_slot: i32,
    data: Option<&[u8]>,
) -> HostResult<()> {
    let (ptr, len) = match data {
        None => (0, 0),
        Some(bytes) => {
            let len = i32::try_from(bytes.len())
                .map_err(|_| trap(caller, EngineError::Internal("output too large".into())))?;
            let ptr = memory::alloc_and_write(mem, &mut *caller, bytes)
                .map_err(|e| trap(caller, EngineError::Internal(e.to_string())))?;
            (ptr, len)
        }
    };
    let slots = mem.data_mut(&mut *caller);
    let written = memory::write_i32(slots, ptr_slot, ptr)
        .and_then(|()| memory::write_i32(slots, len_slot, len));
    written.map_err(|e| trap(caller, EngineError::Runtime(e.to_string())))
}

/// Deduct callback gas from the remaining fuel.
fn charge(caller: &mut Caller<'_, GuestState>, cost: u64) -> HostResult<()> {
    let fuel = caller.get_fuel()?;
    let state = caller.data_mut();
    state.callback_gas = state.callback_gas.saturating_add(cost);
    if cost > fuel {
        caller.set_fuel(0)?;
        return Err(trap(caller, EngineError::OutOfGas));
    }
    caller.set_fuel(fuel - cost)?;
    Ok(())
}

/// Charge a callback's gas and unwrap its result, trapping on any failure.
fn settle<T>(caller: &mut Caller<'_, GuestState>, (result, gas): BackendResult<T>) -> HostResult<T> {
    charge(caller, gas.cost)?;
    result.map_err(|e| trap(caller, e.into()))
}

/// Like [`settle`], but a user error is handed back as `None`.
fn settle_recoverable<T>(
    caller: &mut Caller<'_, GuestState>,
    (result, gas): BackendResult<T>,
) -> HostResult<Option<T>> {
    charge(caller, gas.cost)?;
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_recoverable() => {
            debug!(error = %e, "address translation rejected by host");
            Ok(None)
        }
        Err(e) => Err(trap(caller, e.into())),
    }
}

// ── Storage ──

fn register_db_read(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "db_read",
        |mut caller: Caller<'_, GuestState>,
         key_ptr: i32,
         key_len: i32,
         out_ptr: i32,
         out_len: i32|
         -> HostResult<i32> {
            let mem = guest_memory(&mut caller)?;
            let key = required(&mut caller, &mem, key_ptr, key_len)?;
            let res = caller.data_mut().db.get(&key);
            let value = settle(&mut caller, res)?;
            output(&mut caller, &mem, out_ptr, out_len, value.as_deref())?;
            Ok(STATUS_OK)
        },
    )?;
    Ok(())
}

fn register_db_write(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "db_write",
        |mut caller: Caller<'_, GuestState>,
         key_ptr: i32,
         key_len: i32,
         val_ptr: i32,
         val_len: i32|
         -> HostResult<i32> {
            let mem = guest_memory(&mut caller)?;
            let key = required(&mut caller, &mem, key_ptr, key_len)?;
            let value = required(&mut caller, &mem, val_ptr, val_len)?;
            let res = caller.data_mut().db.set(&key, &value);
            settle(&mut caller, res)?;
            Ok(STATUS_OK)
        },
    )?;
    Ok(())
}

fn register_db_remove(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "db_remove",
        |mut caller: Caller<'_, GuestState>, key_ptr: i32, key_len: i32| -> HostResult<i32> {
            let mem = guest_memory(&mut caller)?;
            let key = required(&mut caller, &mem, key_ptr, key_len)?;
            let res = caller.data_mut().db.remove(&key);
            settle(&mut caller, res)?;
            Ok(STATUS_OK)
        },
    )?;
    Ok(())
}

/// Returns the id of the new iterator.
fn register_db_scan(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "db_scan",
        |mut caller: Caller<'_, GuestState>,
         start_ptr: i32,
         start_len: i32,
         end_ptr: i32,
         end_len: i32,
         order: i32|
         -> HostResult<i32> {
            let mem = guest_memory(&mut caller)?;
            let start = input(&mut caller, &mem, start_ptr, start_len)?;
            let end = input(&mut caller, &mem, end_ptr, end_len)?;
            // the order is forwarded unchecked, the host rejects bad values
            let res = caller
                .data_mut()
                .db
                .scan_raw(start.as_deref(), end.as_deref(), order);
            let it = settle(&mut caller, res)?;
            let id = caller.data_mut().park_iterator(it);
            match id {
                Some(id) => Ok(id),
                None => Err(trap(&mut caller, EngineError::Internal("too many iterators".into()))),
            }
        },
    )?;
    Ok(())
}

/// Writes the next record, or two absent markers at the end.
fn register_db_next(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "db_next",
        |mut caller: Caller<'_, GuestState>,
         iterator_id: i32,
         key_ptr: i32,
         key_len: i32,
         val_ptr: i32,
         val_len: i32|
         -> HostResult<i32> {
            let mem = guest_memory(&mut caller)?;
            let res = caller.data_mut().next_record(iterator_id);
            let record = settle(&mut caller, res)?;
            let (key, value) = match &record {
                Some((k, v)) => (Some(k.as_slice()), Some(v.as_slice())),
                None => (None, None),
            };
            output(&mut caller, &mem, key_ptr, key_len, key)?;
            output(&mut caller, &mem, val_ptr, val_len, value)?;
            Ok(STATUS_OK)
        },
    )?;
    Ok(())
}

// ── Address API ──

fn register_addr_humanize(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "addr_humanize",
        |mut caller: Caller<'_, GuestState>,
         canonical_ptr: i32,
         canonical_len: i32,
         out_ptr: i32,
         out_len: i32|
         -> HostResult<i32> {
            let mem = guest_memory(&mut caller)?;
            let canonical = required(&mut caller, &mem, canonical_ptr, canonical_len)?;
            let res = caller.data().api.humanize(&canonical);
            match settle_recoverable(&mut caller, res)? {
                Some(human) => {
                    output(&mut caller, &mem, out_ptr, out_len, Some(human.as_bytes()))?;
                    Ok(STATUS_OK)
                }
                None => Ok(STATUS_USER_ERROR),
            }
        },
    )?;
    Ok(())
}

fn register_addr_canonicalize(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "addr_canonicalize",
        |mut caller: Caller<'_, GuestState>,
         human_ptr: i32,
         human_len: i32,
         out_ptr: i32,
         out_len: i32|
         -> HostResult<i32> {
            let mem = guest_memory(&mut caller)?;
            let human = required(&mut caller, &mem, human_ptr, human_len)?;
            let res = match std::str::from_utf8(&human) {
                Ok(human) => caller.data().api.canonicalize(human),
                // not an address; the host never sees it
                Err(_) => return Ok(STATUS_USER_ERROR),
            };
            match settle_recoverable(&mut caller, res)? {
                Some(canonical) => {
                    output(&mut caller, &mem, out_ptr, out_len, Some(&canonical))?;
                    Ok(STATUS_OK)
                }
                None => Ok(STATUS_USER_ERROR),
            }
        },
    )?;
    Ok(())
}

// ── Querier ──

/// Writes the JSON `QuerierResult`. The query may spend at most the fuel
/// left at the time of the call.
fn register_query_chain(linker: &mut Linker<GuestState>) -> Result<(), SandboxError> {
    linker.func_wrap(
        IMPORT_MODULE,
        "query_chain",
        |mut caller: Caller<'_, GuestState>,
         request_ptr: i32,
         request_len: i32,
         out_ptr: i32,
         out_len: i32|
         -> HostResult<i32> {
            let mem = guest_memory(&mut caller)?;
            let request = required(&mut caller, &mem, request_ptr, request_len)?;
            let gas_limit = caller.get_fuel()?;
            let res = caller.data().querier.query_raw(&request, gas_limit);
            let result = settle(&mut caller, res)?;
            output(&mut caller, &mem, out_ptr, out_len, Some(&result))?;
            Ok(STATUS_OK)
        },
    )?;
    Ok(())
}
