//! Key/value storage abstraction the engine reaches through the bridge.
//!
//! Implementations:
//! - `MemStore` (this crate), an in-memory `BTreeMap` for testing
//! - whatever backend the embedding host provides

use crate::error::HostError;

/// A single `(key, value)` pair yielded by an iterator.
pub type Record = (Vec<u8>, Vec<u8>);

/// Direction of a range scan. The discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Order {
    Ascending = 1,
    Descending = 2,
}

impl Order {
    /// Parse the raw value received across the boundary.
    ///
    /// Anything other than 1 or 2 is rejected.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Ascending),
            2 => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Cursor over a key range.
///
/// Iterators outlive the callback that created them: the bridge parks them
/// in its frame registry until the invocation ends. They therefore own
/// everything they need and must be `Send`.
pub trait KvIterator: Send {
    /// Advance and return the next record, or `None` once exhausted.
    fn next(&mut self) -> Result<Option<Record>, HostError>;
}

/// Host key/value storage.
///
/// Gas, if any, is charged by the implementation on whatever meter it
/// shares with the capability set.
pub trait Storage {
    /// Returns `Ok(None)` if the key does not exist. An existing empty value
    /// is `Ok(Some(vec![]))`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, HostError>;

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), HostError>;

    /// Deleting a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), HostError>;

    /// Iterate over `[start, end)` in the given order. `None` leaves that
    /// side of the range unbounded.
    fn range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Result<Box<dyn KvIterator>, HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_from_i32() {
        assert_eq!(Order::from_i32(1), Some(Order::Ascending));
        assert_eq!(Order::from_i32(2), Some(Order::Descending));
        assert_eq!(Order::from_i32(0), None);
        assert_eq!(Order::from_i32(7), None);
        assert_eq!(Order::Descending as i32, 2);
    }
}
