//! Per-invocation execution context.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use vsync_storage::StorageError;

use crate::error::SyncError;

/// Caller-supplied context for one reconciliation.
///
/// Every store call the reconciler makes is raced against the cancellation
/// token; a cancelled context aborts the outstanding call and surfaces
/// [`SyncError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct SyncContext {
    cancel: CancellationToken,
}

impl SyncContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs a store call unless the context is cancelled first.
    pub async fn run<T, F>(&self, call: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            result = call => result.map_err(SyncError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_passes_result_through() {
        let ctx = SyncContext::new();
        let ok = ctx.run(async { Ok::<_, StorageError>(7) }).await.unwrap();
        assert_eq!(ok, 7);

        let err = ctx
            .run(async { Err::<(), _>(StorageError::unavailable("down")) })
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_pending_call() {
        let token = CancellationToken::new();
        let ctx = SyncContext::with_cancellation(token.clone());

        let pending = ctx.run(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, StorageError>(())
        });
        token.cancel();

        assert!(matches!(pending.await, Err(SyncError::Cancelled)));
        assert!(ctx.is_cancelled());
    }
}
