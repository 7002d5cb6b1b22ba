//! Session termination signal.

use std::fmt;

/// Why the session was ended by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// A refresh attempt failed (rejected, timed out, or unreachable).
    RefreshFailed(String),
    /// A request to the refresh endpoint itself came back 401.
    RefreshRejected,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RefreshFailed(cause) => write!(f, "token refresh failed: {cause}"),
            Self::RefreshRejected => f.write_str("refresh credential rejected"),
        }
    }
}

/// Receives the "navigate to the unauthenticated entry point" signal.
///
/// By the time a listener is called the access token has already been cleared.
pub trait SessionListener: Send + Sync {
    fn session_terminated(&self, reason: &TerminationReason);
}

impl<F> SessionListener for F
where
    F: Fn(&TerminationReason) + Send + Sync,
{
    fn session_terminated(&self, reason: &TerminationReason) {
        self(reason)
    }
}
