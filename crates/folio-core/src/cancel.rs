//! Cancellation helpers shared by every feed client.
//!
//! Fetches take a [`CancellationToken`] owned by the widget that issued them.
//! Cancelling the token resolves any in-flight fetch to
//! [`DataError::Cancelled`] at its next await point.

use std::future::Future;

pub use tokio_util::sync::CancellationToken;

use crate::error::{DataError, Result};

/// Races `fut` against `cancel`, resolving to [`DataError::Cancelled`] if the
/// token fires first.
///
/// An already-cancelled token never polls `fut`.
pub async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(DataError::Cancelled);
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(DataError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let value = cancellable(&token, async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<()> = cancellable(&token, async {
            panic!("future must not be polled");
        })
        .await;
        assert!(matches!(result, Err(DataError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_future() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });

        let result: Result<()> = cancellable(&token, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
