// Shared concurrency limiter
//
// One counting semaphore shared by every queue so the number of batch writes
// in flight never exceeds the database pool budget. A slot is released when
// the returned permit is dropped.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;

use crate::error::LimiterError;

#[derive(Debug, Clone)]
pub struct SharedLimiter {
    sem: Arc<Semaphore>,
    max_concurrent: usize,
}

/// Held for the duration of one batch write.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl SharedLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            sem: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    /// Wait for a slot, giving up when `token` is cancelled.
    pub async fn acquire(&self, token: &CancellationToken) -> Result<LimiterPermit, LimiterError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(LimiterError::Cancelled),
            permit = self.sem.clone().acquire_owned() => permit
                .map(|permit| LimiterPermit { _permit: permit })
                .map_err(|_| LimiterError::Closed),
        }
    }

    pub fn try_acquire(&self) -> Option<LimiterPermit> {
        match self.sem.clone().try_acquire_owned() {
            Ok(permit) => Some(LimiterPermit { _permit: permit }),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => None,
        }
    }

    /// Return a slot early. Equivalent to dropping the permit.
    pub fn release(&self, permit: LimiterPermit) {
        drop(permit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn bounds_concurrency() {
        let limiter = SharedLimiter::new(2);
        let token = CancellationToken::new();

        let a = limiter.acquire(&token).await.unwrap();
        let _b = limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.available(), 0);

        limiter.release(a);
        assert_eq!(limiter.available(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[tokio::test]
    async fn acquire_observes_cancellation() {
        let limiter = SharedLimiter::new(1);
        let token = CancellationToken::new();
        let _held = limiter.acquire(&token).await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            let token = token.clone();
            tokio::spawn(async move { limiter.acquire(&token).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let result = waiter.await.unwrap();
        assert_eq!(result, Err(LimiterError::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_token_wins_even_with_free_slots() {
        let limiter = SharedLimiter::new(4);
        let token = CancellationToken::new();
        token.cancel();
        assert!(limiter.acquire(&token).await.is_err());
    }
}
