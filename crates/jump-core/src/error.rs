//! Engine error taxonomy.
//!
//! Every failure that reaches the user is rendered through [`std::fmt::Display`] as a short
//! status message. [`JumpError::SessionAlreadyActive`] is the one variant that is never
//! reported (re-entry is simply ignored).

use crate::host::HostError;
use thiserror::Error;

/// Errors produced by the jump engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JumpError {
    /// The Match Index found nothing to tag, filter or edit.
    #[error("No candidates found")]
    NoCandidates,
    /// The requested range is empty, inverted, or outside the document.
    #[error("Invalid range: {start}..{end}")]
    InvalidRange {
        /// Requested start byte offset.
        start: usize,
        /// Requested end byte offset.
        end: usize,
    },
    /// The host refused a write.
    #[error("Mod attempt while read-only")]
    ReadOnlyRejected,
    /// An entry point was invoked while another session is live.
    #[error("A session is already active")]
    SessionAlreadyActive,
    /// Replaying the edit log over the original snapshot did not reproduce the live buffer.
    #[error("Transaction integrity violation (expected {expected} bytes, found {actual})")]
    TransactionIntegrityViolation {
        /// Length of the re-derived buffer.
        expected: usize,
        /// Length of the live buffer.
        actual: usize,
    },
    /// A command needs a live session of a particular kind and none exists.
    #[error("No matching session is active")]
    NoSession,
    /// The query could not be turned into a matcher.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Repeat was requested before any replacement was committed.
    #[error("No previous replacement")]
    NothingToRepeat,
}

impl JumpError {
    /// Whether this error should produce a user-visible status message.
    pub fn is_reported(&self) -> bool {
        !matches!(self, JumpError::SessionAlreadyActive)
    }
}

impl From<HostError> for JumpError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::ReadOnly => JumpError::ReadOnlyRejected,
            HostError::OutOfBounds { start, end, .. } => JumpError::InvalidRange { start, end },
            HostError::NotCharBoundary(offset) => JumpError::InvalidRange {
                start: offset,
                end: offset,
            },
        }
    }
}
