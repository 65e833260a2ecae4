//! Call frames and the iterators they own.
//!
//! Each top-level invocation runs inside one frame. Iterators opened by
//! `scan` during that invocation are parked in the frame's slot of the
//! registry and addressed by `(frame_id, index)` handles. When the frame
//! ends every iterator it owns is dropped, whatever the engine did with its
//! handles.
//!
//! Frame ids come from a process-wide counter and are never reused. Id 0 is
//! never issued, so a zeroed handle is always invalid.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use callgate_hostapi::KvIterator;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::RegistryError;

pub type FrameId = u64;

type ParkedIterator = Arc<Mutex<Box<dyn KvIterator>>>;

static GLOBAL: Lazy<FrameRegistry> = Lazy::new(FrameRegistry::new);

/// Live frames and the iterators registered in each of them.
pub struct FrameRegistry {
    counter: AtomicU64,
    frames: DashMap<FrameId, Vec<ParkedIterator>>,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            frames: DashMap::new(),
        }
    }

    /// The registry host callbacks resolve iterator handles against.
    pub fn global() -> &'static FrameRegistry {
        &GLOBAL
    }

    pub fn begin_frame(&self) -> FrameId {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.frames.insert(id, Vec::new());
        id
    }

    /// Drop the frame and all of its iterators. Returns how many were released.
    ///
    /// Ending an unknown frame is a no-op.
    pub fn end_frame(&self, id: FrameId) -> usize {
        // iterators are dropped after the shard lock is released
        match self.frames.remove(&id) {
            Some((_, iterators)) => iterators.len(),
            None => 0,
        }
    }

    /// Park an iterator in a frame and return its index.
    pub fn register_iterator(
        &self,
        id: FrameId,
        iterator: Box<dyn KvIterator>,
    ) -> Result<u64, RegistryError> {
        let mut iterators = self
            .frames
            .get_mut(&id)
            .ok_or(RegistryError::UnknownFrame(id))?;
        iterators.push(Arc::new(Mutex::new(iterator)));
        Ok((iterators.len() - 1) as u64)
    }

    /// Look up an iterator and run `f` on it.
    ///
    /// The frame's shard lock is released before `f` runs, so `f` may begin
    /// or end other frames.
    pub fn with_iterator<R>(
        &self,
        id: FrameId,
        index: u64,
        f: impl FnOnce(&mut dyn KvIterator) -> R,
    ) -> Result<R, RegistryError> {
        let found = match self.frames.get(&id) {
            Some(iterators) => usize::try_from(index)
                .ok()
                .and_then(|i| iterators.get(i))
                .cloned(),
            None => return Err(RegistryError::UnknownFrame(id)),
        };
        let iterator = found.ok_or(RegistryError::UnknownIterator { frame: id, index })?;
        // a previous step that panicked leaves the iterator usable
        let mut guard = iterator.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut **guard))
    }

    /// Number of iterators parked in a frame, 0 for unknown frames.
    pub fn live_iterators(&self, id: FrameId) -> usize {
        self.frames.get(&id).map_or(0, |iterators| iterators.len())
    }

    pub fn contains(&self, id: FrameId) -> bool {
        self.frames.contains_key(&id)
    }

    pub fn active_frames(&self) -> usize {
        self.frames.len()
    }
}

impl Default for FrameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for one frame. Ends the frame when dropped, including during
/// unwinding.
pub struct Frame<'r> {
    id: FrameId,
    registry: &'r FrameRegistry,
}

impl Frame<'static> {
    /// Begin a frame in the global registry.
    pub fn begin() -> Self {
        Self::begin_in(FrameRegistry::global())
    }
}

impl<'r> Frame<'r> {
    pub fn begin_in(registry: &'r FrameRegistry) -> Self {
        let id = registry.begin_frame();
        debug!(frame = id, "frame begin");
        Self { id, registry }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        let released = self.registry.end_frame(self.id);
        debug!(frame = self.id, released, "frame end");
    }
}
