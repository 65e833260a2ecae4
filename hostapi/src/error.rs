//! Host-side error types.
//!
//! `HostError` is what every host capability returns. The bridge maps its
//! variants onto callback outcomes: `OutOfGas` stays `OutOfGas`, `User`
//! becomes a message the contract can see, `Internal` becomes a fatal
//! `Other`.
//!
//! Hosts that cannot return an error from deep inside their own code (a gas
//! meter buried in a storage backend, for example) may instead raise
//! [`OutOfGas`] as a panic payload via [`panic_out_of_gas`]. The bridge
//! recognises that payload and classifies it as out-of-gas, not as a panic.

use std::fmt;

/// Error returned by host capability implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host's gas meter ran out while serving the request.
    OutOfGas,
    /// Error caused by the caller's input. Returned to the contract.
    User(String),
    /// Host-only failure. Aborts the current invocation.
    Internal(String),
}

impl HostError {
    pub fn user(msg: impl Into<String>) -> Self {
        Self::User(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn is_out_of_gas(&self) -> bool {
        matches!(self, Self::OutOfGas)
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfGas => write!(f, "out of gas"),
            Self::User(msg) => write!(f, "{}", msg),
            Self::Internal(msg) => write!(f, "internal host error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

/// Panic payload signalling gas exhaustion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfGas {
    /// Which operation ran out, for diagnostics only.
    pub descriptor: String,
}

/// Abort the current host operation with an [`OutOfGas`] payload.
pub fn panic_out_of_gas(descriptor: impl Into<String>) -> ! {
    std::panic::panic_any(OutOfGas {
        descriptor: descriptor.into(),
    })
}
