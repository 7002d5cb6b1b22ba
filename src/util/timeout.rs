//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

/// Wrap a future with a timeout, mapping expiry to [`ClientError::Timeout`].
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pending_future_times_out() {
        let result: Result<(), _> =
            with_timeout(Duration::from_secs(5), futures::future::pending()).await;
        assert!(matches!(result, Err(ClientError::Timeout(5000))));
    }

    #[tokio::test]
    async fn ready_future_passes_through() {
        let result = with_timeout(Duration::from_secs(5), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
