//! Gas cost table for the reference host capabilities.
//!
//! The bridge itself never prices anything: it only measures deltas on
//! whatever meter the host supplies. These constants are what the
//! in-memory store, mock address API and mock querier charge.

// ── Storage ──

/// Base cost for a storage read.
pub const G_DB_READ: u64 = 200;

/// Base cost for a storage write.
pub const G_DB_WRITE: u64 = 500;

/// Base cost for a storage delete.
pub const G_DB_REMOVE: u64 = 300;

/// Base cost for opening a range scan.
pub const G_DB_SCAN: u64 = 100;

/// Base cost for advancing an iterator by one record.
pub const G_ITER_NEXT: u64 = 30;

/// Per-byte cost added to storage operations.
pub const G_PER_BYTE: u64 = 3;

// ── Address API ──

pub const G_HUMANIZE: u64 = 400;

pub const G_CANONICALIZE: u64 = 400;

// ── Querier ──

/// Base cost for a query served by the host querier.
pub const G_QUERY: u64 = 1_000;

/// `base + byte_count * per_byte`, saturating.
pub fn cost_with_bytes(base: u64, per_byte: u64, byte_count: usize) -> u64 {
    base.saturating_add((byte_count as u64).saturating_mul(per_byte))
}
