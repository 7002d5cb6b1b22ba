//! Single-flight access token refresh.
//!
//! The coordinator owns the two pieces of shared session state: the
//! [`AccessToken`] and the at-most-one in-flight refresh operation. A request
//! that fails with 401 asks [`RefreshCoordinator::refreshed_token`] for a token
//! to retry with. Concurrent callers all await the same shared operation, so
//! one burst of 401s produces exactly one call to the refresh endpoint and every
//! caller retries with the same resulting token.
//!
//! The state mutex is only held for bookkeeping and is never held across an
//! `.await`. The refresh call runs on its own task, so it settles even when
//! every caller waiting on it has been cancelled.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

use super::session::{SessionListener, TerminationReason};
use super::token::AccessToken;
use crate::error::ClientError;
use crate::util::with_timeout;

/// Why no refreshed token is available. Awaiting requests surface their own
/// original 401 rather than this value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshFailure {
    #[error("token refresh failed: {0}")]
    Failed(String),
    #[error("session ended before the request could be retried")]
    SessionEnded,
}

type RefreshOperation = Shared<BoxFuture<'static, Result<String, RefreshFailure>>>;

enum RefreshState {
    Idle,
    Refreshing(RefreshOperation),
}

/// Owner of the shared access token and the refresh protocol.
///
/// Cloning is cheap; clones coordinate through the same state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    token: AccessToken,
    state: Mutex<RefreshState>,
    listeners: Mutex<Vec<Arc<dyn SessionListener>>>,
    refresh_timeout: Duration,
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("token", &self.inner.token)
            .field("refreshing", &self.is_refreshing())
            .field("refresh_timeout", &self.inner.refresh_timeout)
            .finish()
    }
}

impl RefreshCoordinator {
    pub fn new(token: AccessToken, refresh_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                state: Mutex::new(RefreshState::Idle),
                listeners: Mutex::new(Vec::new()),
                refresh_timeout,
            }),
        }
    }

    /// Read handle on the shared token.
    pub fn token(&self) -> &AccessToken {
        &self.inner.token
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.inner.lock_state(), RefreshState::Refreshing(_))
    }

    /// Install a token obtained by logging in.
    pub fn establish(&self, token: String) {
        tracing::debug!("Access token established");
        self.inner.token.set(token);
    }

    /// Drop the token after a deliberate logout. Listeners are not notified.
    pub fn end_session(&self) {
        tracing::debug!("Access token cleared by logout");
        self.inner.token.clear();
    }

    /// Clear the token and tell every listener the session is over.
    pub fn terminate_session(&self, reason: TerminationReason) {
        self.inner.terminate(reason);
    }

    /// Resolve the token a request rejected with 401 should be retried with.
    ///
    /// `sent_with` is the bearer token the failed request carried. Joins an
    /// in-flight refresh when there is one. When the shared token has already
    /// moved past `sent_with`, the current token is returned without a network
    /// call. Otherwise `refresh` is invoked to start the single refresh
    /// operation. On failure the token is cleared and listeners are notified
    /// exactly once per operation, however many callers were waiting.
    ///
    /// Must be called from within a Tokio runtime; the refresh runs on a spawned task.
    pub async fn refreshed_token<F, Fut>(
        &self,
        sent_with: Option<&str>,
        refresh: F,
    ) -> Result<String, RefreshFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ClientError>> + Send + 'static,
    {
        let operation = {
            let mut state = self.inner.lock_state();
            let in_flight = match &*state {
                RefreshState::Refreshing(operation) => Some(operation.clone()),
                RefreshState::Idle => None,
            };
            match in_flight {
                Some(operation) => {
                    tracing::debug!("Waiting for in-flight token refresh");
                    operation
                }
                None => {
                    match (sent_with, self.inner.token.get()) {
                        (Some(sent), Some(current)) if sent != current => {
                            tracing::debug!("Access token already rotated, skipping refresh");
                            return Ok(current);
                        }
                        (Some(_), None) => return Err(RefreshFailure::SessionEnded),
                        _ => {}
                    }
                    tracing::info!("Starting token refresh");
                    let operation = self.start(refresh());
                    *state = RefreshState::Refreshing(operation.clone());
                    operation
                }
            }
        };
        operation.await
    }

    /// Spawn the refresh so it settles even if every awaiting caller is dropped.
    fn start<Fut>(&self, call: Fut) -> RefreshOperation
    where
        Fut: Future<Output = Result<String, ClientError>> + Send + 'static,
    {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let timeout = self.inner.refresh_timeout;
        let task = tokio::spawn({
            let inner = inner.clone();
            async move {
                let outcome = with_timeout(timeout, call).await;
                match inner.upgrade() {
                    Some(inner) => inner.settle(outcome),
                    None => outcome.map_err(|err| RefreshFailure::Failed(err.to_string())),
                }
            }
        });
        async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(error = %err, "Token refresh task aborted");
                    if let Some(inner) = inner.upgrade() {
                        inner.abandon();
                    }
                    Err(RefreshFailure::Failed(err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs exactly once per refresh operation.
    fn settle(&self, outcome: Result<String, ClientError>) -> Result<String, RefreshFailure> {
        let mut state = self.lock_state();
        *state = RefreshState::Idle;
        match outcome {
            Ok(token) => {
                self.token.set(token.clone());
                drop(state);
                tracing::info!("Token refresh succeeded");
                Ok(token)
            }
            Err(err) => {
                self.token.clear();
                drop(state);
                tracing::warn!(error = %err, category = %err.category(), "Token refresh failed");
                let message = err.to_string();
                self.terminate(TerminationReason::RefreshFailed(message.clone()));
                Err(RefreshFailure::Failed(message))
            }
        }
    }

    /// The refresh task died without settling. The token is left as it was.
    fn abandon(&self) {
        *self.lock_state() = RefreshState::Idle;
    }

    fn terminate(&self, reason: TerminationReason) {
        self.token.clear();
        tracing::warn!(%reason, "Session terminated");
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener.session_terminated(&reason);
        }
    }
}
