//! Host callback tables handed to the engine.
//!
//! Each table is a `#[repr(C)]` set of `unsafe extern "C"` function
//! pointers plus an opaque pointer to the host state it operates on. The
//! engine never looks behind the opaque pointers. It calls the functions
//! (normally via the safe adapters in [`crate::backend`]) and decodes the
//! returned outcome code. Calling a function directly is `unsafe`: the state
//! pointers passed must be null or come from a live table.
//!
//! Tables borrow the [`FrameContext`] they were built from, so they cannot
//! outlive it in safe code. [`Capabilities::into_parts`] erases that borrow
//! for engines that must store the tables, and is `unsafe` for that reason.
//!
//! Every callback follows the same shape:
//!
//! 1. reject missing out-slots, null state and nil required inputs with
//!    `BadArgument`, before the host is touched
//! 2. copy borrowed input
//! 3. run the host operation under [`consumed_during`] and write the delta
//!    to `gas_used`
//! 4. hand fresh output buffers to the engine
//!
//! all inside [`guarded`], so nothing unwinds across the boundary.

use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};

use callgate_hostapi::{AddressApi, GasMeter, HostError, Order, Querier, Storage};
use callgate_primitives::{to_querier_result, Binary, QuerierResult, QueryRequest, SystemError, SystemResult};
use tracing::error;

use crate::classify::{classify_panic, guarded};
use crate::error::CallbackError;
use crate::frame::{FrameId, FrameRegistry};
use crate::gas::{consumed_during, QuerierGas};
use crate::memory::{Buffer, BufferView};

// ── Opaque state ──

#[repr(C)]
pub struct OpaqueStorage {
    _private: [u8; 0],
}

#[repr(C)]
pub struct OpaqueGasMeter {
    _private: [u8; 0],
}

#[repr(C)]
pub struct OpaqueApi {
    _private: [u8; 0],
}

#[repr(C)]
pub struct OpaqueQuerier {
    _private: [u8; 0],
}

// ── Function tables ──

pub type ReadFn = unsafe extern "C" fn(
    *mut OpaqueStorage,
    *const OpaqueGasMeter,
    Option<&mut u64>,
    BufferView<'_>,
    Option<&mut Buffer>,
    Option<&mut Buffer>,
) -> i32;

pub type WriteFn = unsafe extern "C" fn(
    *mut OpaqueStorage,
    *const OpaqueGasMeter,
    Option<&mut u64>,
    BufferView<'_>,
    BufferView<'_>,
    Option<&mut Buffer>,
) -> i32;

pub type RemoveFn = unsafe extern "C" fn(
    *mut OpaqueStorage,
    *const OpaqueGasMeter,
    Option<&mut u64>,
    BufferView<'_>,
    Option<&mut Buffer>,
) -> i32;

pub type ScanFn = unsafe extern "C" fn(
    *mut OpaqueStorage,
    *const OpaqueGasMeter,
    Option<&mut u64>,
    BufferView<'_>,
    BufferView<'_>,
    i32,
    Option<&mut HostIterator<'_>>,
    Option<&mut Buffer>,
) -> i32;

pub type NextFn = unsafe extern "C" fn(
    IteratorHandle,
    *const OpaqueGasMeter,
    Option<&mut u64>,
    Option<&mut Buffer>,
    Option<&mut Buffer>,
    Option<&mut Buffer>,
) -> i32;

pub type AddressFn = unsafe extern "C" fn(
    *const OpaqueApi,
    BufferView<'_>,
    Option<&mut Buffer>,
    Option<&mut Buffer>,
    Option<&mut u64>,
) -> i32;

pub type QueryExternalFn = unsafe extern "C" fn(
    *const OpaqueQuerier,
    u64,
    Option<&mut u64>,
    BufferView<'_>,
    Option<&mut Buffer>,
    Option<&mut Buffer>,
) -> i32;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct DbVtable {
    pub read: ReadFn,
    pub write: WriteFn,
    pub remove: RemoveFn,
    pub scan: ScanFn,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct IteratorVtable {
    pub next: NextFn,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct ApiVtable {
    pub humanize: AddressFn,
    pub canonicalize: AddressFn,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct QuerierVtable {
    pub query_external: QueryExternalFn,
}

impl Default for DbVtable {
    fn default() -> Self {
        Self {
            read: db_read,
            write: db_write,
            remove: db_remove,
            scan: db_scan,
        }
    }
}

impl Default for IteratorVtable {
    fn default() -> Self {
        Self { next: iterator_next }
    }
}

impl Default for ApiVtable {
    fn default() -> Self {
        Self {
            humanize: addr_humanize,
            canonicalize: addr_canonicalize,
        }
    }
}

impl Default for QuerierVtable {
    fn default() -> Self {
        Self {
            query_external: query_external,
        }
    }
}

// ── Tables bound to state ──

/// Address of an iterator parked in the frame registry.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IteratorHandle {
    pub frame_id: FrameId,
    pub index: u64,
}

impl IteratorHandle {
    pub fn is_valid(&self) -> bool {
        self.frame_id != 0
    }
}

/// Storage table of one invocation. `'a` is the borrow of the
/// [`FrameContext`] its state pointers point into.
#[repr(C)]
pub struct DbTable<'a> {
    pub(crate) state: *mut OpaqueStorage,
    pub(crate) gas_meter: *const OpaqueGasMeter,
    pub(crate) vtable: DbVtable,
    _frame: PhantomData<&'a mut ()>,
}

/// Iterator produced by `scan`. Advanced with its `next` function.
#[repr(C)]
pub struct HostIterator<'a> {
    pub handle: IteratorHandle,
    pub(crate) gas_meter: *const OpaqueGasMeter,
    pub(crate) vtable: IteratorVtable,
    _frame: PhantomData<&'a ()>,
}

impl Default for HostIterator<'_> {
    /// An unbound iterator. Advancing it yields `BadArgument`.
    fn default() -> Self {
        Self {
            handle: IteratorHandle::default(),
            gas_meter: std::ptr::null(),
            vtable: IteratorVtable::default(),
            _frame: PhantomData,
        }
    }
}

#[repr(C)]
pub struct ApiTable<'a> {
    pub(crate) state: *const OpaqueApi,
    pub(crate) vtable: ApiVtable,
    _frame: PhantomData<&'a ()>,
}

#[repr(C)]
pub struct QuerierTable<'a> {
    pub(crate) state: *const OpaqueQuerier,
    pub(crate) vtable: QuerierVtable,
    _frame: PhantomData<&'a ()>,
}

/// Host storage bound to the frame its iterators are registered in.
pub struct FrameStorage<'a> {
    frame_id: FrameId,
    storage: &'a mut dyn Storage,
}

impl<'a> FrameStorage<'a> {
    pub fn new(frame_id: FrameId, storage: &'a mut dyn Storage) -> Self {
        Self { frame_id, storage }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

/// Everything one invocation's callbacks point into. Must outlive the
/// [`Capabilities`] built from it.
pub struct FrameContext<'a> {
    storage: FrameStorage<'a>,
    gas_meter: &'a dyn GasMeter,
    api: &'a dyn AddressApi,
    querier: &'a dyn Querier,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        storage: FrameStorage<'a>,
        gas_meter: &'a dyn GasMeter,
        api: &'a dyn AddressApi,
        querier: &'a dyn Querier,
    ) -> Self {
        Self {
            storage,
            gas_meter,
            api,
            querier,
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.storage.frame_id
    }

    /// Build the callback tables for this context.
    pub fn capabilities(&mut self) -> Capabilities<'_> {
        let gas_meter = &self.gas_meter as *const &dyn GasMeter as *const OpaqueGasMeter;
        Capabilities {
            db: DbTable {
                state: &mut self.storage as *mut FrameStorage<'a> as *mut OpaqueStorage,
                gas_meter,
                vtable: DbVtable::default(),
                _frame: PhantomData,
            },
            api: ApiTable {
                state: &self.api as *const &dyn AddressApi as *const OpaqueApi,
                vtable: ApiVtable::default(),
                _frame: PhantomData,
            },
            querier: QuerierTable {
                state: &self.querier as *const &dyn Querier as *const OpaqueQuerier,
                vtable: QuerierVtable::default(),
                _frame: PhantomData,
            },
        }
    }
}

/// The callback tables of one invocation.
///
/// Borrowed from a [`FrameContext`] and neither `Send` nor `Sync`, so the
/// bound host objects stay on the invoking thread. Nothing derived from the
/// tables, iterators included, outlives the context:
///
/// ```compile_fail
/// use callgate_bridge::{Frame, FrameContext, FrameStorage};
/// use callgate_hostapi::{HostGasMeter, MemStore, MockApi, MockQuerier, Order};
///
/// let frame = Frame::begin();
/// let meter = HostGasMeter::unlimited();
/// let api = MockApi::default();
/// let querier = MockQuerier::default();
/// let mut it = {
///     let mut store = MemStore::new();
///     let mut context =
///         FrameContext::new(FrameStorage::new(frame.id(), &mut store), &meter, &api, &querier);
///     let mut caps = context.capabilities();
///     caps.db().scan(None, None, Order::Ascending).0.unwrap()
/// };
/// let _ = it.next();
/// ```
///
/// Erasing the lifetime takes an `unsafe` block:
///
/// ```compile_fail
/// use callgate_bridge::{Frame, FrameContext, FrameStorage};
/// use callgate_hostapi::{HostGasMeter, MemStore, MockApi, MockQuerier};
///
/// let frame = Frame::begin();
/// let meter = HostGasMeter::unlimited();
/// let api = MockApi::default();
/// let querier = MockQuerier::default();
/// let mut store = MemStore::new();
/// let mut context =
///     FrameContext::new(FrameStorage::new(frame.id(), &mut store), &meter, &api, &querier);
/// let (mut db, _, _) = context.capabilities().into_parts();
/// let _ = db.get(b"k");
/// ```
pub struct Capabilities<'a> {
    db: DbTable<'a>,
    api: ApiTable<'a>,
    querier: QuerierTable<'a>,
}

impl<'a> Capabilities<'a> {
    pub fn db(&mut self) -> &mut DbTable<'a> {
        &mut self.db
    }

    pub fn api(&self) -> &ApiTable<'a> {
        &self.api
    }

    pub fn querier(&self) -> &QuerierTable<'a> {
        &self.querier
    }

    /// Split into the raw tables, with their lifetime erased.
    ///
    /// # Safety
    ///
    /// The tables, and every iterator scanned from them, must not be used
    /// after the `Engine::call` that received these capabilities returns.
    /// Past that point their state pointers dangle.
    pub unsafe fn into_parts(self) -> (DbTable<'static>, ApiTable<'static>, QuerierTable<'static>) {
        let Self { db, api, querier } = self;
        (
            DbTable {
                state: db.state,
                gas_meter: db.gas_meter,
                vtable: db.vtable,
                _frame: PhantomData,
            },
            ApiTable {
                state: api.state,
                vtable: api.vtable,
                _frame: PhantomData,
            },
            QuerierTable {
                state: querier.state,
                vtable: querier.vtable,
                _frame: PhantomData,
            },
        )
    }
}

// ── State recovery ──

unsafe fn storage_from<'a, 'b>(
    state: *mut OpaqueStorage,
) -> Result<&'a mut FrameStorage<'b>, CallbackError> {
    (state as *mut FrameStorage<'b>)
        .as_mut()
        .ok_or(CallbackError::BadArgument)
}

unsafe fn gas_meter_from<'a>(ptr: *const OpaqueGasMeter) -> Result<&'a dyn GasMeter, CallbackError> {
    (ptr as *const &dyn GasMeter)
        .as_ref()
        .map(|meter| *meter)
        .ok_or(CallbackError::BadArgument)
}

unsafe fn api_from<'a>(ptr: *const OpaqueApi) -> Result<&'a dyn AddressApi, CallbackError> {
    (ptr as *const &dyn AddressApi)
        .as_ref()
        .map(|api| *api)
        .ok_or(CallbackError::BadArgument)
}

unsafe fn querier_from<'a>(ptr: *const OpaqueQuerier) -> Result<&'a dyn Querier, CallbackError> {
    (ptr as *const &dyn Querier)
        .as_ref()
        .map(|querier| *querier)
        .ok_or(CallbackError::BadArgument)
}

fn required(view: BufferView<'_>) -> Result<Vec<u8>, CallbackError> {
    view.read()
        .map(<[u8]>::to_vec)
        .ok_or(CallbackError::BadArgument)
}

/// Run a host operation, write its gas delta and classify its failure.
fn metered<T>(
    name: &'static str,
    meter: &dyn GasMeter,
    gas_used: &mut u64,
    body: impl FnOnce() -> Result<T, HostError>,
) -> Result<T, CallbackError> {
    let measured = consumed_during(meter, body);
    match measured.delta {
        Ok(delta) => *gas_used = delta,
        Err(negative) => {
            *gas_used = 0;
            error!(callback = name, before = negative.before, after = negative.after, "negative gas delta");
            return Err(CallbackError::Other(negative.to_string()));
        }
    }
    match measured.result {
        Ok(res) => res.map_err(CallbackError::from),
        Err(payload) => Err(classify_panic(name, payload)),
    }
}

// ── Storage callbacks ──

unsafe extern "C" fn db_read(
    state: *mut OpaqueStorage,
    gas_meter: *const OpaqueGasMeter,
    gas_used: Option<&mut u64>,
    key: BufferView<'_>,
    value_out: Option<&mut Buffer>,
    err_out: Option<&mut Buffer>,
) -> i32 {
    guarded("db_read", err_out, || {
        let (Some(gas_used), Some(value_out)) = (gas_used, value_out) else {
            return Err(CallbackError::BadArgument);
        };
        let db = unsafe { storage_from(state) }?;
        let meter = unsafe { gas_meter_from(gas_meter) }?;
        let key = required(key)?;

        let value = metered("db_read", meter, gas_used, || db.storage.get(&key))?;
        // a missing key leaves the slot null
        if let Some(value) = value {
            *value_out = Buffer::from_vec(value);
        }
        Ok(())
    })
    .as_i32()
}

unsafe extern "C" fn db_write(
    state: *mut OpaqueStorage,
    gas_meter: *const OpaqueGasMeter,
    gas_used: Option<&mut u64>,
    key: BufferView<'_>,
    value: BufferView<'_>,
    err_out: Option<&mut Buffer>,
) -> i32 {
    guarded("db_write", err_out, || {
        let Some(gas_used) = gas_used else {
            return Err(CallbackError::BadArgument);
        };
        let db = unsafe { storage_from(state) }?;
        let meter = unsafe { gas_meter_from(gas_meter) }?;
        let key = required(key)?;
        let value = required(value)?;

        metered("db_write", meter, gas_used, || db.storage.set(&key, &value))
    })
    .as_i32()
}

unsafe extern "C" fn db_remove(
    state: *mut OpaqueStorage,
    gas_meter: *const OpaqueGasMeter,
    gas_used: Option<&mut u64>,
    key: BufferView<'_>,
    err_out: Option<&mut Buffer>,
) -> i32 {
    guarded("db_remove", err_out, || {
        let Some(gas_used) = gas_used else {
            return Err(CallbackError::BadArgument);
        };
        let db = unsafe { storage_from(state) }?;
        let meter = unsafe { gas_meter_from(gas_meter) }?;
        let key = required(key)?;

        metered("db_remove", meter, gas_used, || db.storage.delete(&key))
    })
    .as_i32()
}

#[allow(clippy::too_many_arguments)]
unsafe extern "C" fn db_scan(
    state: *mut OpaqueStorage,
    gas_meter: *const OpaqueGasMeter,
    gas_used: Option<&mut u64>,
    start: BufferView<'_>,
    end: BufferView<'_>,
    order: i32,
    out: Option<&mut HostIterator<'_>>,
    err_out: Option<&mut Buffer>,
) -> i32 {
    guarded("db_scan", err_out, || {
        let (Some(gas_used), Some(out)) = (gas_used, out) else {
            return Err(CallbackError::BadArgument);
        };
        let db = unsafe { storage_from(state) }?;
        let meter = unsafe { gas_meter_from(gas_meter) }?;
        let order = Order::from_i32(order).ok_or(CallbackError::BadArgument)?;
        // nil bounds leave that side of the range open
        let start = start.read().map(<[u8]>::to_vec);
        let end = end.read().map(<[u8]>::to_vec);

        let iterator = metered("db_scan", meter, gas_used, || {
            db.storage.range(start.as_deref(), end.as_deref(), order)
        })?;
        let frame_id = db.frame_id;
        let index = FrameRegistry::global().register_iterator(frame_id, iterator)?;

        *out = HostIterator {
            handle: IteratorHandle { frame_id, index },
            gas_meter,
            vtable: IteratorVtable::default(),
            _frame: PhantomData,
        };
        Ok(())
    })
    .as_i32()
}

unsafe extern "C" fn iterator_next(
    handle: IteratorHandle,
    gas_meter: *const OpaqueGasMeter,
    gas_used: Option<&mut u64>,
    key_out: Option<&mut Buffer>,
    value_out: Option<&mut Buffer>,
    err_out: Option<&mut Buffer>,
) -> i32 {
    guarded("iterator_next", err_out, || {
        let (Some(gas_used), Some(key_out), Some(value_out)) = (gas_used, key_out, value_out)
        else {
            return Err(CallbackError::BadArgument);
        };
        if !handle.is_valid() {
            return Err(CallbackError::BadArgument);
        }

        // a handle from an ended frame fails the lookup before its meter
        // pointer is touched
        let record = FrameRegistry::global().with_iterator(handle.frame_id, handle.index, |it| {
            let meter = unsafe { gas_meter_from(gas_meter) }?;
            metered("iterator_next", meter, gas_used, || it.next())
        })??;
        // a null key marks the end
        if let Some((key, value)) = record {
            *key_out = Buffer::from_vec(key);
            *value_out = Buffer::from_vec(value);
        }
        Ok(())
    })
    .as_i32()
}

// ── Address callbacks ──

fn translate_address<T>(
    name: &'static str,
    out: Option<&mut Buffer>,
    gas_used: Option<&mut u64>,
    input: BufferView<'_>,
    translate: impl FnOnce(Vec<u8>) -> (Result<T, HostError>, u64),
    into_bytes: impl FnOnce(T) -> Vec<u8>,
) -> Result<(), CallbackError> {
    let (Some(out), Some(gas_used)) = (out, gas_used) else {
        return Err(CallbackError::BadArgument);
    };
    let input = required(input)?;

    let (result, cost) = panic::catch_unwind(AssertUnwindSafe(|| translate(input)))
        .map_err(|payload| classify_panic(name, payload))?;
    *gas_used = cost;
    let translated = into_bytes(result?);
    if translated.is_empty() {
        error!(callback = name, "address api returned an empty result");
        return Err(CallbackError::Other(format!("{} returned an empty address", name)));
    }
    *out = Buffer::from_vec(translated);
    Ok(())
}

unsafe extern "C" fn addr_humanize(
    state: *const OpaqueApi,
    canonical: BufferView<'_>,
    human_out: Option<&mut Buffer>,
    err_out: Option<&mut Buffer>,
    gas_used: Option<&mut u64>,
) -> i32 {
    guarded("addr_humanize", err_out, || {
        let api = unsafe { api_from(state) }?;
        translate_address(
            "humanize",
            human_out,
            gas_used,
            canonical,
            |canonical| api.humanize(&canonical),
            String::into_bytes,
        )
    })
    .as_i32()
}

unsafe extern "C" fn addr_canonicalize(
    state: *const OpaqueApi,
    human: BufferView<'_>,
    canonical_out: Option<&mut Buffer>,
    err_out: Option<&mut Buffer>,
    gas_used: Option<&mut u64>,
) -> i32 {
    guarded("addr_canonicalize", err_out, || {
        let api = unsafe { api_from(state) }?;
        translate_address(
            "canonicalize",
            canonical_out,
            gas_used,
            human,
            |human| match String::from_utf8(human) {
                Ok(human) => api.canonicalize(&human),
                Err(e) => (Err(HostError::user(format!("address is not utf-8: {}", e))), 0),
            },
            |canonical| canonical,
        )
    })
    .as_i32()
}

// ── Querier callback ──

fn run_query(querier: &dyn Querier, request: &[u8], gas_limit: u64) -> QuerierResult {
    match serde_json::from_slice::<QueryRequest>(request) {
        Ok(request) => to_querier_result(querier.query(&request, gas_limit)),
        Err(e) => SystemResult::Err(SystemError::InvalidRequest {
            error: e.to_string(),
            request: Binary(request.to_vec()),
        }),
    }
}

unsafe extern "C" fn query_external(
    state: *const OpaqueQuerier,
    gas_limit: u64,
    gas_used: Option<&mut u64>,
    request: BufferView<'_>,
    result_out: Option<&mut Buffer>,
    err_out: Option<&mut Buffer>,
) -> i32 {
    guarded("query_external", err_out, || {
        let (Some(gas_used), Some(result_out)) = (gas_used, result_out) else {
            return Err(CallbackError::BadArgument);
        };
        let querier = unsafe { querier_from(state) }?;
        let request = required(request)?;

        let result = metered("query_external", &QuerierGas(querier), gas_used, || {
            Ok(run_query(querier, &request, gas_limit))
        })?;
        if *gas_used > gas_limit {
            return Err(CallbackError::OutOfGas);
        }
        let bz = serde_json::to_vec(&result).map_err(|e| CallbackError::Other(e.to_string()))?;
        *result_out = Buffer::from_vec(bz);
        Ok(())
    })
    .as_i32()
}
