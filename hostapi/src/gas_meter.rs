//! Host-side gas meters.
//!
//! The bridge only ever reads [`GasMeter::gas_consumed`] before and after a
//! host operation and interprets the difference. `HostGasMeter` is the
//! reference meter: it enforces a limit and is shared between the storage
//! backend and the capabilities that charge it.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{panic_out_of_gas, HostError};

/// Read-only view of a host gas meter.
pub trait GasMeter {
    /// Total gas consumed so far. Only differences between two readings
    /// are meaningful.
    fn gas_consumed(&self) -> u64;
}

/// Limit-enforcing gas meter.
///
/// Charges are checked before applying, so on error the consumed count
/// remains unchanged.
#[derive(Debug)]
pub struct HostGasMeter {
    limit: u64,
    consumed: AtomicU64,
}

impl HostGasMeter {
    /// Create a new gas meter with the given limit.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            consumed: AtomicU64::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    /// Charge gas. Returns `Err(OutOfGas)` if the limit would be exceeded.
    pub fn charge(&self, amount: u64) -> Result<(), HostError> {
        self.consumed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                current.checked_add(amount).filter(|v| *v <= self.limit)
            })
            .map(|_| ())
            .map_err(|_| HostError::OutOfGas)
    }

    /// Charge gas, raising the out-of-gas panic payload on exhaustion.
    pub fn charge_or_panic(&self, amount: u64, descriptor: &str) {
        if self.charge(amount).is_err() {
            panic_out_of_gas(descriptor);
        }
    }

    /// Returns the total gas consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::SeqCst)
    }

    /// Returns the remaining gas before the limit is reached.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed())
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn is_exhausted(&self) -> bool {
        self.consumed() >= self.limit
    }
}

impl GasMeter for HostGasMeter {
    fn gas_consumed(&self) -> u64 {
        self.consumed()
    }
}
