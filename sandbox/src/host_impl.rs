//! Per-invocation state held in the Wasmtime `Store`.
//!
//! `GuestState` owns the callback tables of the invocation, the iterators
//! the guest opened, the host region allocator and the memory limiter. It
//! is created for one `Engine::call` and dropped before that call returns,
//! which is what keeps the lifetime-erased tables valid.

use callgate_bridge::{
    ApiTable, BackendError, BackendResult, DbTable, EngineError, HostIterator, QuerierTable,
};
use wasmtime::{StoreLimits, StoreLimitsBuilder};

use crate::memory::{HostRegion, WASM_PAGE_SIZE};

pub struct GuestState {
    pub db: DbTable<'static>,
    pub api: ApiTable<'static>,
    pub querier: QuerierTable<'static>,
    /// Iterators opened by `db_scan`, addressed by their position.
    pub iterators: Vec<HostIterator<'static>>,
    pub region: HostRegion,
    pub limits: StoreLimits,
    /// Total gas reported by callbacks, already deducted from fuel.
    pub callback_gas: u64,
    /// Why the last trap raised by a host function was raised.
    pub failure: Option<EngineError>,
}

impl GuestState {
    pub fn new(
        db: DbTable<'static>,
        api: ApiTable<'static>,
        querier: QuerierTable<'static>,
        max_memory_pages: u32,
    ) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(max_memory_pages as usize * WASM_PAGE_SIZE)
            .instances(1)
            .build();
        Self {
            db,
            api,
            querier,
            iterators: Vec::new(),
            region: HostRegion::default(),
            limits,
            callback_gas: 0,
            failure: None,
        }
    }

    /// Store an iterator and return the id the guest refers to it by.
    pub fn park_iterator(&mut self, it: HostIterator<'static>) -> Option<i32> {
        let id = i32::try_from(self.iterators.len()).ok()?;
        self.iterators.push(it);
        Some(id)
    }

    pub fn next_record(&mut self, id: i32) -> BackendResult<Option<(Vec<u8>, Vec<u8>)>> {
        match usize::try_from(id).ok().and_then(|i| self.iterators.get_mut(i)) {
            Some(it) => it.next(),
            None => (Err(BackendError::BadArgument), Default::default()),
        }
    }
}
