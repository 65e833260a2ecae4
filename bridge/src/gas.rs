//! Gas accounting across the boundary.
//!
//! Callbacks never price anything. They read the host meter immediately
//! before and after the host operation and report the difference, so the
//! engine can charge exactly what the host charged. Partial consumption is
//! reported even when the operation aborts.

use std::panic::{self, AssertUnwindSafe};
use std::thread;

use callgate_hostapi::{GasMeter, Querier};

/// The meter reading decreased during an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("gas meter went backwards: {before} before, {after} after")]
pub struct NegativeGasDelta {
    pub before: u64,
    pub after: u64,
}

/// Result of a measured host operation.
pub struct Metered<R> {
    /// What the operation returned, or the payload it panicked with.
    pub result: thread::Result<R>,
    pub delta: Result<u64, NegativeGasDelta>,
}

/// Run `body` and measure how much gas `meter` recorded while it ran.
///
/// Unwinding out of `body` is caught so the delta can still be read.
pub fn consumed_during<R>(meter: &dyn GasMeter, body: impl FnOnce() -> R) -> Metered<R> {
    let before = meter.gas_consumed();
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    let after = meter.gas_consumed();
    let delta = after
        .checked_sub(before)
        .ok_or(NegativeGasDelta { before, after });
    Metered { result, delta }
}

/// Exposes a querier's own consumption as a meter.
pub(crate) struct QuerierGas<'a>(pub &'a dyn Querier);

impl GasMeter for QuerierGas<'_> {
    fn gas_consumed(&self) -> u64 {
        self.0.gas_consumed()
    }
}
