//! Error types reported across the session boundary.

use serde::{Deserialize, Serialize};

/// Errors a session operation can report back to the calling client.
///
/// Everything else the server hits (stale handles inside a command batch,
/// malformed policy entries, degenerate geometry) is logged and absorbed;
/// only operations with a direct caller get a `SessionError`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionError {
    /// An allocation would exceed the session's quota. Nothing was mutated.
    QuotaExceeded {
        /// Bytes the operation needed
        needed: u64,
        /// Bytes still available to the session
        available: u64,
    },

    /// The session's command queue is at capacity
    CommandQueueFull,

    /// A view handle or capability did not resolve to a live view
    UnknownView,

    /// A session capability did not resolve to a live session
    UnknownSession,

    /// Focus forwarding describes a cycle; the delegation was ignored
    ForwardCycle,
}

impl SessionError {
    /// Create a quota error.
    pub fn quota_exceeded(needed: u64, available: u64) -> Self {
        Self::QuotaExceeded { needed, available }
    }

    /// Check if this is a quota error.
    pub fn is_quota(&self) -> bool {
        matches!(self, SessionError::QuotaExceeded { .. })
    }

    /// Check if this is a stale-handle error.
    pub fn is_lookup(&self) -> bool {
        matches!(self, SessionError::UnknownView | SessionError::UnknownSession)
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::QuotaExceeded { needed, available } => {
                write!(f, "quota exceeded: needed {needed} bytes, {available} available")
            }
            SessionError::CommandQueueFull => write!(f, "command queue full"),
            SessionError::UnknownView => write!(f, "unknown view"),
            SessionError::UnknownSession => write!(f, "unknown session"),
            SessionError::ForwardCycle => write!(f, "focus forwarding cycle"),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        assert!(SessionError::quota_exceeded(10, 5).is_quota());
        assert!(!SessionError::UnknownView.is_quota());
        assert!(SessionError::UnknownView.is_lookup());
        assert!(SessionError::UnknownSession.is_lookup());
        assert!(!SessionError::CommandQueueFull.is_lookup());
    }

    #[test]
    fn test_error_serializes() {
        let err = SessionError::quota_exceeded(1536000, 1535999);
        let json = serde_json::to_string(&err).unwrap();
        let back: SessionError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
