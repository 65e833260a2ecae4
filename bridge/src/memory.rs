//! Buffers crossing the host/engine boundary.
//!
//! Two shapes exist:
//!
//! - [`BufferView`] borrows bytes owned by the other side for the duration
//!   of one call. It is only ever read, and copied before use.
//! - [`Buffer`] is a fresh allocation made by the side that produces data.
//!   Ownership moves to the receiver, which releases it exactly once with
//!   [`Buffer::consume`] or [`release_buffer`].
//!
//! A null `Buffer` means "no value". An empty allocation is a distinct,
//! non-null value: `get` of an existing key with an empty value returns one.

use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::{ptr, slice};

/// Owned byte allocation handed across the boundary.
#[repr(C)]
#[derive(Debug)]
pub struct Buffer {
    pub ptr: *mut u8,
    pub len: usize,
    pub cap: usize,
}

impl Buffer {
    /// The "no value" sentinel.
    pub fn null() -> Self {
        Self {
            ptr: ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }

    /// Transfer ownership of `v` into a buffer.
    ///
    /// An empty vector yields a non-null buffer of length zero.
    pub fn from_vec(v: Vec<u8>) -> Self {
        let mut v = ManuallyDrop::new(v);
        Self {
            ptr: v.as_mut_ptr(),
            len: v.len(),
            cap: v.capacity(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Take the allocation back. Returns `None` for a null buffer.
    ///
    /// # Safety
    ///
    /// The buffer must have been created by [`Buffer::from_vec`] (or be null)
    /// and must not have been consumed or released before.
    pub unsafe fn consume(self) -> Option<Vec<u8>> {
        if self.ptr.is_null() {
            None
        } else {
            Some(Vec::from_raw_parts(self.ptr, self.len, self.cap))
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::null()
    }
}

/// Free a buffer received from the other side without reading it.
///
/// # Safety
///
/// Same contract as [`Buffer::consume`].
pub unsafe extern "C" fn release_buffer(buf: Buffer) {
    drop(buf.consume());
}

/// Borrowed input bytes, valid for the duration of one call.
///
/// Can only be built from a real slice (or as nil), so the declared length
/// never exceeds its backing storage.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a> {
    ptr: *const u8,
    len: usize,
    is_nil: bool,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> BufferView<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            ptr: data.as_ptr(),
            len: data.len(),
            is_nil: false,
            _marker: PhantomData,
        }
    }

    /// A view standing for "no value", e.g. an unbounded range end.
    pub fn nil() -> Self {
        Self {
            ptr: ptr::null(),
            len: 0,
            is_nil: true,
            _marker: PhantomData,
        }
    }

    pub fn from_option(data: Option<&'a [u8]>) -> Self {
        data.map_or_else(Self::nil, Self::new)
    }

    pub fn is_nil(&self) -> bool {
        self.is_nil
    }

    /// The viewed bytes, or `None` for a nil view.
    pub fn read(&self) -> Option<&'a [u8]> {
        if self.is_nil {
            None
        } else {
            // SAFETY: ptr/len come from a live `&'a [u8]` in `new`
            Some(unsafe { slice::from_raw_parts(self.ptr, self.len) })
        }
    }
}
