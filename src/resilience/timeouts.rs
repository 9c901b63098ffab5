//! Timeout enforcement.
//!
//! Wraps bridge-side waits (subscription message, upstream handshake) in a
//! deadline. Upstream HTTP calls carry their timeouts on the reqwest client.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// A wait exceeded its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{what} timed out after {after:?}")]
pub struct TimedOut {
    pub what: &'static str,
    pub after: Duration,
}

/// Run `fut`, failing with [`TimedOut`] if it does not finish within `limit`.
pub async fn with_deadline<F, T>(what: &'static str, limit: Duration, fut: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TimedOut { what, after: limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_deadline() {
        let value = with_deadline("quick", Duration::from_secs(1), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let result = with_deadline(
            "handshake",
            Duration::from_millis(50),
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.what, "handshake");
        assert_eq!(err.to_string(), "handshake timed out after 50ms");
    }
}
