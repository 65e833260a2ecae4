//! Engine-side view of the callback tables.
//!
//! Engines call the host through these adapters instead of invoking the
//! function pointers themselves. Each adapter allocates the out-slots,
//! calls the table, takes ownership of whatever the host wrote and decodes
//! the outcome. The gas reported by the host is returned next to the
//! result in every case, including failures, so the engine can charge it
//! before deciding whether to abort.

use callgate_hostapi::{Order, Record};
use callgate_primitives::{QuerierResult, QueryRequest};

use crate::callbacks::{ApiTable, DbTable, HostIterator, QuerierTable};
use crate::error::BackendError;
use crate::memory::{Buffer, BufferView};

/// Gas reported by one host callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasInfo {
    pub cost: u64,
}

impl GasInfo {
    pub fn with_cost(cost: u64) -> Self {
        Self { cost }
    }

    pub fn free() -> Self {
        Self::default()
    }
}

pub type BackendResult<T> = (Result<T, BackendError>, GasInfo);

/// Decode an outcome, releasing the error buffer.
fn finish(code: i32, err: Buffer) -> Result<(), BackendError> {
    // SAFETY: err was null on entry and is only ever written by a callback
    let msg = unsafe { err.consume() };
    match BackendError::from_outcome(code, msg) {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

// SAFETY (every `unsafe` table call below): tables are only built by
// `FrameContext::capabilities`, and their lifetime, or the contract of
// `Capabilities::into_parts`, keeps the state they point into alive.

/// Take back an output slot. The callback either left it null or filled it
/// with a fresh allocation.
fn take(slot: Buffer) -> Option<Vec<u8>> {
    unsafe { slot.consume() }
}

impl<'a> DbTable<'a> {
    /// `Ok(None)` if the key does not exist.
    pub fn get(&mut self, key: &[u8]) -> BackendResult<Option<Vec<u8>>> {
        let mut gas_used = 0u64;
        let mut value = Buffer::null();
        let mut err = Buffer::null();
        let code = unsafe {
            (self.vtable.read)(
                self.state,
                self.gas_meter,
                Some(&mut gas_used),
                BufferView::new(key),
                Some(&mut value),
                Some(&mut err),
            )
        };
        let value = take(value);
        (finish(code, err).map(|()| value), GasInfo::with_cost(gas_used))
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) -> BackendResult<()> {
        let mut gas_used = 0u64;
        let mut err = Buffer::null();
        let code = unsafe {
            (self.vtable.write)(
                self.state,
                self.gas_meter,
                Some(&mut gas_used),
                BufferView::new(key),
                BufferView::new(value),
                Some(&mut err),
            )
        };
        (finish(code, err), GasInfo::with_cost(gas_used))
    }

    pub fn remove(&mut self, key: &[u8]) -> BackendResult<()> {
        let mut gas_used = 0u64;
        let mut err = Buffer::null();
        let code = unsafe {
            (self.vtable.remove)(
                self.state,
                self.gas_meter,
                Some(&mut gas_used),
                BufferView::new(key),
                Some(&mut err),
            )
        };
        (finish(code, err), GasInfo::with_cost(gas_used))
    }

    pub fn scan(
        &mut self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> BackendResult<HostIterator<'a>> {
        self.scan_raw(start, end, order as i32)
    }

    /// Scan with an order value as received from guest code, unchecked.
    pub fn scan_raw(
        &mut self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: i32,
    ) -> BackendResult<HostIterator<'a>> {
        let mut gas_used = 0u64;
        let mut out = HostIterator::default();
        let mut err = Buffer::null();
        let code = unsafe {
            (self.vtable.scan)(
                self.state,
                self.gas_meter,
                Some(&mut gas_used),
                BufferView::from_option(start),
                BufferView::from_option(end),
                order,
                Some(&mut out),
                Some(&mut err),
            )
        };
        (finish(code, err).map(|()| out), GasInfo::with_cost(gas_used))
    }
}

impl HostIterator<'_> {
    /// The next record, or `None` once the range is exhausted.
    pub fn next(&mut self) -> BackendResult<Option<Record>> {
        let mut gas_used = 0u64;
        let mut key = Buffer::null();
        let mut value = Buffer::null();
        let mut err = Buffer::null();
        let code = unsafe {
            (self.vtable.next)(
                self.handle,
                self.gas_meter,
                Some(&mut gas_used),
                Some(&mut key),
                Some(&mut value),
                Some(&mut err),
            )
        };
        let key = take(key);
        let value = take(value);
        let gas = GasInfo::with_cost(gas_used);
        if let Err(e) = finish(code, err) {
            return (Err(e), gas);
        }
        let record = match (key, value) {
            (None, _) => Ok(None),
            (Some(k), Some(v)) => Ok(Some((k, v))),
            (Some(_), None) => Err(BackendError::Unknown {
                msg: "iterator returned a key without a value".to_string(),
            }),
        };
        (record, gas)
    }
}

impl ApiTable<'_> {
    pub fn humanize(&self, canonical: &[u8]) -> BackendResult<String> {
        let mut gas_used = 0u64;
        let mut human = Buffer::null();
        let mut err = Buffer::null();
        let code = unsafe {
            (self.vtable.humanize)(
                self.state,
                BufferView::new(canonical),
                Some(&mut human),
                Some(&mut err),
                Some(&mut gas_used),
            )
        };
        let human = take(human);
        let result = finish(code, err).and_then(|()| {
            let bytes = human.ok_or_else(|| BackendError::Unknown {
                msg: "humanize returned no result".to_string(),
            })?;
            String::from_utf8(bytes).map_err(|e| BackendError::Unknown { msg: e.to_string() })
        });
        (result, GasInfo::with_cost(gas_used))
    }

    pub fn canonicalize(&self, human: &str) -> BackendResult<Vec<u8>> {
        let mut gas_used = 0u64;
        let mut canonical = Buffer::null();
        let mut err = Buffer::null();
        let code = unsafe {
            (self.vtable.canonicalize)(
                self.state,
                BufferView::new(human.as_bytes()),
                Some(&mut canonical),
                Some(&mut err),
                Some(&mut gas_used),
            )
        };
        let canonical = take(canonical);
        let result = finish(code, err).and_then(|()| {
            canonical.ok_or_else(|| BackendError::Unknown {
                msg: "canonicalize returned no result".to_string(),
            })
        });
        (result, GasInfo::with_cost(gas_used))
    }
}

impl QuerierTable<'_> {
    /// Forward a JSON request. Returns the JSON encoded [`QuerierResult`].
    pub fn query_raw(&self, request: &[u8], gas_limit: u64) -> BackendResult<Vec<u8>> {
        let mut gas_used = 0u64;
        let mut result = Buffer::null();
        let mut err = Buffer::null();
        let code = unsafe {
            (self.vtable.query_external)(
                self.state,
                gas_limit,
                Some(&mut gas_used),
                BufferView::new(request),
                Some(&mut result),
                Some(&mut err),
            )
        };
        let result = take(result);
        let result = finish(code, err).and_then(|()| {
            result.ok_or_else(|| BackendError::Unknown {
                msg: "querier returned no result".to_string(),
            })
        });
        (result, GasInfo::with_cost(gas_used))
    }

    /// Typed convenience over [`QuerierTable::query_raw`].
    pub fn query(&self, request: &QueryRequest, gas_limit: u64) -> BackendResult<QuerierResult> {
        let bz = match serde_json::to_vec(request) {
            Ok(bz) => bz,
            Err(e) => return (Err(BackendError::Unknown { msg: e.to_string() }), GasInfo::free()),
        };
        let (result, gas) = self.query_raw(&bz, gas_limit);
        let parsed = result.and_then(|bz| {
            serde_json::from_slice(&bz).map_err(|e| BackendError::Unknown { msg: e.to_string() })
        });
        (parsed, gas)
    }
}
