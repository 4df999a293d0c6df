//! Timeout and cancellation bounds for provider calls.

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;

/// Caller-supplied bounds applied to every provider call of one request.
///
/// The default budget has no timeout and a token nobody cancels.
#[derive(Debug, Clone, Default)]
pub struct CallBudget {
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl CallBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each provider call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abort provider calls once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail with [`ProviderError::Cancelled`] if the token has fired.
    pub fn check(&self) -> Result<(), ProviderError> {
        if self.cancel.is_cancelled() {
            Err(ProviderError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Drive `call` to completion unless the budget runs out first.
    ///
    /// Cancellation wins over a result that becomes ready at the same time.
    pub async fn run<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        self.check()?;

        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| ProviderError::Timeout(limit))?,
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProviderError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unbounded_budget_passes_result_through() {
        let budget = CallBudget::new();
        let result = budget.run(async { Ok::<_, ProviderError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires() {
        let budget = CallBudget::new().with_timeout(Duration::from_millis(50));
        let result = budget
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, ProviderError>(())
            })
            .await;
        assert_eq!(result, Err(ProviderError::Timeout(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let token = CancellationToken::new();
        token.cancel();
        let budget = CallBudget::new().with_cancellation(token);

        assert!(budget.is_cancelled());
        let result = budget.run(async { Ok::<_, ProviderError>(1) }).await;
        assert_eq!(result, Err(ProviderError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_during_call() {
        let token = CancellationToken::new();
        let budget = CallBudget::new().with_cancellation(token.clone());

        let call = budget.run(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, ProviderError>(())
        });
        let canceller = async {
            tokio::task::yield_now().await;
            token.cancel();
        };

        let (result, ()) = tokio::join!(call, canceller);
        assert_eq!(result, Err(ProviderError::Cancelled));
    }
}
