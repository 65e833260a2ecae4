//! Guest linear memory access with bounds checking, and the host-owned
//! region that callback results are written into.
//!
//! Pointer `0` is reserved to mean "absent". The host region always starts
//! above the guest's initial memory, so a host-written buffer, even an
//! empty one, never has address 0.

use wasmtime::{AsContextMut, Memory};

use crate::error::SandboxError;
use crate::host_impl::GuestState;

pub const WASM_PAGE_SIZE: usize = 65536;

/// Pages reserved for host-written buffers when an instance starts.
pub const HOST_REGION_PAGES: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("guest memory access out of bounds: ptr {ptr}, len {len}")]
pub struct OutOfBounds {
    pub ptr: i32,
    pub len: i32,
}

fn range(mem_size: usize, ptr: i32, len: i32) -> Result<std::ops::Range<usize>, OutOfBounds> {
    let oob = OutOfBounds { ptr, len };
    let start = usize::try_from(ptr).map_err(|_| oob)?;
    let len = usize::try_from(len).map_err(|_| oob)?;
    let end = start.checked_add(len).ok_or(oob)?;
    if end > mem_size {
        return Err(oob);
    }
    Ok(start..end)
}

/// Copy `len` bytes at `ptr` out of guest memory.
pub fn read_bytes(mem: &[u8], ptr: i32, len: i32) -> Result<Vec<u8>, OutOfBounds> {
    let r = range(mem.len(), ptr, len)?;
    Ok(mem[r].to_vec())
}

/// Like [`read_bytes`], but pointer 0 reads as `None`.
pub fn read_optional(mem: &[u8], ptr: i32, len: i32) -> Result<Option<Vec<u8>>, OutOfBounds> {
    if ptr == 0 {
        return Ok(None);
    }
    read_bytes(mem, ptr, len).map(Some)
}

pub fn write_bytes(mem: &mut [u8], ptr: i32, data: &[u8]) -> Result<(), OutOfBounds> {
    let len = i32::try_from(data.len()).map_err(|_| OutOfBounds { ptr, len: i32::MAX })?;
    let r = range(mem.len(), ptr, len)?;
    mem[r].copy_from_slice(data);
    Ok(())
}

pub fn read_i32(mem: &[u8], ptr: i32) -> Result<i32, OutOfBounds> {
    let r = range(mem.len(), ptr, 4)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(&mem[r]);
    Ok(i32::from_le_bytes(word))
}

pub fn write_i32(mem: &mut [u8], ptr: i32, value: i32) -> Result<(), OutOfBounds> {
    write_bytes(mem, ptr, &value.to_le_bytes())
}

/// Bump allocator over the host region of guest memory.
///
/// The region is a run of pages the host grew itself. Nothing is ever
/// freed: an instance lives for one invocation only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRegion {
    next: usize,
    end: usize,
}

fn aligned(size: usize) -> usize {
    (size.max(1) + 7) & !7
}

fn pages_for(bytes: usize) -> u64 {
    bytes.div_ceil(WASM_PAGE_SIZE) as u64
}

impl HostRegion {
    pub fn new(base: usize, capacity: usize) -> Self {
        Self {
            next: base,
            end: base + capacity,
        }
    }

    /// Reserve `size` bytes, 8-byte aligned, if they fit in the pages
    /// already grown. Zero-sized reservations still take a slot, so they
    /// get a distinct non-zero address.
    pub fn try_reserve(&mut self, size: usize) -> Option<usize> {
        let ptr = self.next;
        let next = ptr.checked_add(aligned(size))?;
        if next > self.end {
            return None;
        }
        self.next = next;
        Some(ptr)
    }

    /// Pages to grow at `end` so that `size` more bytes fit.
    pub fn shortfall_pages(&self, size: usize) -> u64 {
        pages_for((self.next + aligned(size)).saturating_sub(self.end))
    }

    /// Address one past the last byte of the region.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Extend the region by pages grown directly after it.
    pub fn extend(&mut self, pages: u64) {
        self.end += pages as usize * WASM_PAGE_SIZE;
    }
}

fn grow(
    memory: &Memory,
    store: impl AsContextMut<Data = GuestState>,
    pages: u64,
) -> Result<usize, SandboxError> {
    let prev = memory
        .grow(store, pages)
        .map_err(|e| SandboxError::Memory(format!("cannot grow host region: {}", e)))?;
    usize::try_from(prev)
        .map_err(|_| SandboxError::Memory("host region base out of range".into()))
        .map(|pages| pages * WASM_PAGE_SIZE)
}

/// Grow `memory` by the host region and point the allocator at it.
pub fn init_host_region(
    memory: &Memory,
    mut store: impl AsContextMut<Data = GuestState>,
) -> Result<(), SandboxError> {
    let base = grow(memory, &mut store, HOST_REGION_PAGES)?;
    store.as_context_mut().data_mut().region =
        HostRegion::new(base, HOST_REGION_PAGES as usize * WASM_PAGE_SIZE);
    Ok(())
}

/// Copy `data` into the host region and return its guest address.
///
/// When the region is full it is extended in place if it still ends at the
/// top of memory. If the guest grew memory since, the pages above the region
/// belong to the guest, and a fresh region is started past them.
pub fn alloc_and_write(
    memory: &Memory,
    mut store: impl AsContextMut<Data = GuestState>,
    data: &[u8],
) -> Result<i32, SandboxError> {
    let reserved = store.as_context_mut().data_mut().region.try_reserve(data.len());
    let ptr = match reserved {
        Some(ptr) => ptr,
        None => {
            let region = store.as_context_mut().data().region.clone();
            let at_top = region.end() == memory.data_size(&store);
            let pages = if at_top {
                region.shortfall_pages(data.len())
            } else {
                pages_for(aligned(data.len()))
            };
            let base = grow(memory, &mut store, pages)?;
            let mut ctx = store.as_context_mut();
            let region = &mut ctx.data_mut().region;
            if at_top && base == region.end() {
                region.extend(pages);
            } else {
                *region = HostRegion::new(base, pages as usize * WASM_PAGE_SIZE);
            }
            region
                .try_reserve(data.len())
                .ok_or_else(|| SandboxError::Memory("host region exhausted".into()))?
        }
    };
    let ptr = i32::try_from(ptr)
        .map_err(|_| SandboxError::Memory("host region beyond 2 GiB".into()))?;
    write_bytes(memory.data_mut(store.as_context_mut()), ptr, data)
        .map_err(|e| SandboxError::Memory(e.to_string()))?;
    Ok(ptr)
}
