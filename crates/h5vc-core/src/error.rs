//! Typed error hierarchy for the chunk filter.
//!
//! Every failure of a transform call surfaces as a [`FilterError`]; an empty
//! output buffer is always a valid result and never signals failure.
//!
//! # Error codes
//!
//! Each variant maps to a stable integer code via [`FilterError::error_code`]
//! so the CLI JSON output and the C ABI can report failures without string
//! parsing.

use crate::header::HeaderError;

/// All errors originating from the h5vc filter.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    // ── Codec session ────────────────────────────────────────────────
    #[error("Codec not found: {0}")]
    CodecNotFound(String),

    #[error("Could not allocate codec context: {0}")]
    ContextAllocationFailed(String),

    #[error("Frame is not writable: {0}")]
    FrameNotWritable(String),

    #[error("Could not initialize the conversion context: {0}")]
    ConversionContextFailed(String),

    #[error("Out of memory: could not reserve {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),

    // ── Data contracts ───────────────────────────────────────────────
    #[error("Bitstream unreadable: {0}")]
    BitstreamUnreadable(String),

    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Metadata header error: {0}")]
    Header(#[from] HeaderError),

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Unknown {kind} id {id}")]
    UnknownCodecId { kind: &'static str, id: u32 },

    #[error("Unknown {kind} name '{name}'")]
    UnknownName { kind: &'static str, name: String },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Codec backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Transform timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Worker failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilterError {
    /// Stable integer error code.
    ///
    /// Codes are grouped by category:
    /// - 1xx: codec session
    /// - 2xx: data contracts
    /// - 3xx: configuration
    /// - 4xx: runtime
    pub fn error_code(&self) -> u32 {
        match self {
            Self::CodecNotFound(_) => 100,
            Self::ContextAllocationFailed(_) => 101,
            Self::FrameNotWritable(_) => 102,
            Self::ConversionContextFailed(_) => 103,
            Self::OutOfMemory { .. } => 104,
            Self::Encode(_) => 105,
            Self::Decode(_) => 106,
            Self::BitstreamUnreadable(_) => 200,
            Self::SizeMismatch { .. } => 201,
            Self::Header(_) => 202,
            Self::InvalidParameters(_) => 300,
            Self::UnknownCodecId { .. } => 301,
            Self::UnknownName { .. } => 302,
            Self::BackendUnavailable(_) => 400,
            Self::Timeout { .. } => 401,
            Self::Worker(_) => 402,
            Self::Io(_) => 403,
        }
    }

    /// Short machine-readable category name used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self.error_code() / 100 {
            1 => "codec",
            2 => "data",
            3 => "config",
            _ => "runtime",
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, FilterError>;
