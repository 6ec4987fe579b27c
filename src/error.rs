// src/error.rs
use thiserror::Error;

/// Error taxonomy for the scan engine.
///
/// Transport and Protocol errors are captured per log or per batch and never
/// escalate past the stage that produced them; Decode errors are isolated to
/// a single entry.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Network-level failure or timeout talking to a CT log
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// CT log answered with a non-success status code
    #[error("unexpected status {status}: {body}")]
    Protocol { status: u16, body: String },

    /// Malformed JSON response or certificate bytes
    #[error("decode error: {0}")]
    Decode(String),

    /// Registry or tree-size inconsistency detected during planning
    #[error("planning invariant violated: {0}")]
    Planning(String),

    /// Scan-wide cancellation signal fired while the operation was in flight
    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Short stage-independent classification used in failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::Transport(_) => "transport",
            ScanError::Protocol { .. } => "protocol",
            ScanError::Decode(_) => "decode",
            ScanError::Planning(_) => "planning",
            ScanError::Cancelled => "cancelled",
        }
    }
}
