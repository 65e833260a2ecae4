//! Sandbox error types.

use callgate_bridge::EngineError;

/// Top-level error type for the sandbox crate.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Wasmtime engine, compilation, or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Module validation failed (missing exports, bad imports, unsupported features).
    #[error("validation error: {0}")]
    Validation(String),

    /// On-disk code store failure.
    #[error("code store error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no code stored for checksum {0}")]
    CodeNotFound(String),

    /// Stored code no longer hashes to the checksum it is filed under.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Memory operation failed (out-of-bounds, grow failure).
    #[error("memory error: {0}")]
    Memory(String),
}

impl From<SandboxError> for EngineError {
    fn from(err: SandboxError) -> Self {
        match err {
            SandboxError::CodeNotFound(checksum) => EngineError::CodeNotFound(checksum),
            SandboxError::Validation(msg) => EngineError::InvalidCode(msg),
            // compilation is the only wasmtime failure reachable before a call
            SandboxError::Wasmtime(e) => EngineError::InvalidCode(format!("{:#}", e)),
            other => EngineError::Internal(other.to_string()),
        }
    }
}
