//! Classification of callback failures into outcome codes.
//!
//! Every callback body runs inside [`guarded`]. Nothing unwinds across the
//! boundary: a panic is caught here and reported as `Panic`, unless its
//! payload is the host's out-of-gas marker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use callgate_hostapi::OutOfGas;
use callgate_primitives::Outcome;
use tracing::{debug, error, warn};

use crate::error::CallbackError;
use crate::memory::Buffer;

/// Run a callback body and turn its result into exactly one outcome.
///
/// Only `User` and `Other` write `err_out`. The slot is left untouched for
/// every other outcome.
pub fn guarded<F>(name: &'static str, err_out: Option<&mut Buffer>, body: F) -> Outcome
where
    F: FnOnce() -> Result<(), CallbackError>,
{
    let err = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(())) => return Outcome::Ok,
        Ok(Err(err)) => err,
        Err(payload) => classify_panic(name, payload),
    };

    let outcome = err.outcome();
    if outcome == Outcome::BadArgument {
        warn!(callback = name, "rejected callback arguments");
    }
    if let (Some(msg), Some(slot)) = (err.into_message(), err_out) {
        *slot = Buffer::from_vec(msg.into_bytes());
    }
    outcome
}

/// Map a caught panic payload onto an outcome.
pub fn classify_panic(name: &'static str, payload: Box<dyn Any + Send>) -> CallbackError {
    if let Some(oog) = payload.downcast_ref::<OutOfGas>() {
        debug!(callback = name, descriptor = %oog.descriptor, "host ran out of gas");
        return CallbackError::OutOfGas;
    }
    error!(callback = name, panic = %panic_message(&*payload), "panic in host callback");
    CallbackError::Panic
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
