//! Host-side configuration types.
//!
//! `GasConfig` prices the operations of the reference capabilities in this
//! crate. Default values come from `callgate_primitives::gas`.

use callgate_primitives::gas::{
    cost_with_bytes, G_CANONICALIZE, G_DB_READ, G_DB_REMOVE, G_DB_SCAN, G_DB_WRITE, G_HUMANIZE,
    G_ITER_NEXT, G_PER_BYTE, G_QUERY,
};

/// Per-operation gas costs charged by `MemStore`, `MockApi` and `MockQuerier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasConfig {
    pub db_read: u64,
    pub db_write: u64,
    pub db_remove: u64,
    pub db_scan: u64,
    pub iter_next: u64,
    /// Added per key/value byte to every storage charge.
    pub per_byte: u64,
    pub humanize: u64,
    pub canonicalize: u64,
    pub query: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            db_read: G_DB_READ,
            db_write: G_DB_WRITE,
            db_remove: G_DB_REMOVE,
            db_scan: G_DB_SCAN,
            iter_next: G_ITER_NEXT,
            per_byte: G_PER_BYTE,
            humanize: G_HUMANIZE,
            canonicalize: G_CANONICALIZE,
            query: G_QUERY,
        }
    }
}

impl GasConfig {
    /// A config that charges nothing at all.
    pub fn free() -> Self {
        Self {
            db_read: 0,
            db_write: 0,
            db_remove: 0,
            db_scan: 0,
            iter_next: 0,
            per_byte: 0,
            humanize: 0,
            canonicalize: 0,
            query: 0,
        }
    }

    pub fn read_cost(&self, key_len: usize) -> u64 {
        cost_with_bytes(self.db_read, self.per_byte, key_len)
    }

    pub fn write_cost(&self, key_len: usize, val_len: usize) -> u64 {
        cost_with_bytes(self.db_write, self.per_byte, key_len.saturating_add(val_len))
    }

    pub fn remove_cost(&self, key_len: usize) -> u64 {
        cost_with_bytes(self.db_remove, self.per_byte, key_len)
    }

    /// Cost of one iterator step that produced a record.
    pub fn next_cost(&self, key_len: usize, val_len: usize) -> u64 {
        cost_with_bytes(self.iter_next, self.per_byte, key_len.saturating_add(val_len))
    }

    pub fn query_cost(&self, request_len: usize) -> u64 {
        cost_with_bytes(self.query, self.per_byte, request_len)
    }
}
