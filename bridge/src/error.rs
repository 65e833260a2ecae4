//! Error types of the bridge.
//!
//! - [`CallbackError`] is what a host callback body fails with, before it is
//!   flattened into an outcome code.
//! - [`BackendError`] is what the engine sees after decoding that code.
//! - [`EngineError`] is what an engine reports for a whole invocation.
//! - [`VmError`] is what the host sees from an entry point.

use callgate_hostapi::HostError;
use callgate_primitives::Outcome;

use crate::frame::FrameId;

/// Failure of a single host callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    BadArgument,
    OutOfGas,
    Panic,
    User(String),
    Other(String),
}

impl CallbackError {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::BadArgument => Outcome::BadArgument,
            Self::OutOfGas => Outcome::OutOfGas,
            Self::Panic => Outcome::Panic,
            Self::User(_) => Outcome::User,
            Self::Other(_) => Outcome::Other,
        }
    }

    /// The message to hand back, for the outcomes that carry one.
    pub fn into_message(self) -> Option<String> {
        match self {
            Self::User(msg) | Self::Other(msg) => Some(msg),
            _ => None,
        }
    }
}

impl From<HostError> for CallbackError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::OutOfGas => Self::OutOfGas,
            HostError::User(msg) => Self::User(msg),
            HostError::Internal(msg) => Self::Other(msg),
        }
    }
}

impl From<RegistryError> for CallbackError {
    fn from(_: RegistryError) -> Self {
        Self::BadArgument
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("frame {0} is not active")]
    UnknownFrame(FrameId),
    #[error("iterator {index} does not exist in frame {frame}")]
    UnknownIterator { frame: FrameId, index: u64 },
}

/// A host callback failed, as seen from the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("bad argument passed to host callback")]
    BadArgument,
    #[error("ran out of gas during host callback")]
    OutOfGas,
    #[error("panic in host callback")]
    ForeignPanic,
    #[error("{msg}")]
    UserErr { msg: String },
    #[error("host error: {msg}")]
    Unknown { msg: String },
    #[error("host callback returned unknown outcome code {0}")]
    UnknownOutcome(i32),
}

impl BackendError {
    /// Decode an outcome code and its error buffer contents.
    ///
    /// Returns `None` for `Ok`.
    pub fn from_outcome(code: i32, msg: Option<Vec<u8>>) -> Option<Self> {
        let text = || {
            msg.as_deref()
                .map(|m| String::from_utf8_lossy(m).into_owned())
                .unwrap_or_default()
        };
        let err = match Outcome::from_i32(code) {
            Some(Outcome::Ok) => return None,
            Some(Outcome::Panic) => Self::ForeignPanic,
            Some(Outcome::BadArgument) => Self::BadArgument,
            Some(Outcome::OutOfGas) => Self::OutOfGas,
            Some(Outcome::User) => Self::UserErr { msg: text() },
            Some(Outcome::Other) => Self::Unknown { msg: text() },
            None => Self::UnknownOutcome(code),
        };
        Some(err)
    }

    /// The outcome code this error was decoded from. Codes outside the
    /// known set count as `Other`.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::BadArgument => Outcome::BadArgument,
            Self::OutOfGas => Outcome::OutOfGas,
            Self::ForeignPanic => Outcome::Panic,
            Self::UserErr { .. } => Outcome::User,
            Self::Unknown { .. } | Self::UnknownOutcome(_) => Outcome::Other,
        }
    }

    /// Whether the engine may hand this error to guest code instead of
    /// aborting the invocation.
    pub fn is_recoverable(&self) -> bool {
        !self.outcome().is_fatal()
    }
}

/// Failure of an engine during one invocation or a code operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("no code stored for checksum {0}")]
    CodeNotFound(String),
    #[error("invalid code: {0}")]
    InvalidCode(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("out of gas")]
    OutOfGas,
    #[error("contract execution failed: {0}")]
    Runtime(String),
    #[error("engine error: {0}")]
    Internal(String),
}

/// Failure of a top-level entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmError {
    #[error("out of gas")]
    OutOfGas,
    #[error("bad argument")]
    BadArgument,
    #[error("panic")]
    Panic,
    #[error("{0}")]
    Message(String),
    #[error("engine: {0}")]
    Engine(String),
}

impl From<BackendError> for VmError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::BadArgument => Self::BadArgument,
            BackendError::OutOfGas => Self::OutOfGas,
            BackendError::ForeignPanic => Self::Panic,
            BackendError::UserErr { msg } | BackendError::Unknown { msg } => Self::Message(msg),
            BackendError::UnknownOutcome(_) => Self::Engine(err.to_string()),
        }
    }
}

impl From<EngineError> for VmError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Backend(b) => b.into(),
            EngineError::OutOfGas => Self::OutOfGas,
            EngineError::Runtime(msg) => Self::Message(msg),
            EngineError::CodeNotFound(_) | EngineError::InvalidCode(_) | EngineError::Internal(_) => {
                Self::Engine(err.to_string())
            }
        }
    }
}
