//! Error types for ingestion operations.

use ingest_frame::FrameError;
use thiserror::Error;

/// Errors surfaced by the unary client and the frame processor.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    /// Structural frame problem during decomposition or conversion.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// `ingest` was called before `register_provider`.
    #[error("no provider registered; call register_provider first")]
    UnregisteredProvider,

    /// The processor has not been activated, or has shut down and drained.
    #[error("processor is not accepting or supplying")]
    Inactive,

    /// A blocking wait was cancelled by hard shutdown.
    #[error("wait cancelled by shutdown")]
    Interrupted,

    /// The RPC transport failed; the cause message is preserved.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service rejected a request.
    #[error("service rejected request {request_uid}: {message}")]
    Rejected {
        request_uid: String,
        message: String,
    },
}

impl IngestError {
    /// Returns `true` if the operation can be retried against the same
    /// processor state (the pipeline itself is still usable).
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected { .. })
    }

    /// Returns `true` if the pipeline will never yield again.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Inactive | Self::Interrupted)
    }
}
