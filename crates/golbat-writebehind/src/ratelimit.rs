// Token bucket rate limiter
//
// Sustained rate plus burst capacity. A rate <= 0 yields an unlimited bucket
// that grants every request immediately.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

const MIN_WAIT: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct TokenBucket {
    state: Mutex<BucketState>,
    max_tokens: f64,
    refill_rate: f64,
    unlimited: bool,
}

impl TokenBucket {
    /// `rate_per_second` tokens are added each second up to `burst_capacity`,
    /// which is at least one for a limited bucket. The bucket starts full.
    pub fn new(rate_per_second: f64, burst_capacity: u32) -> Self {
        let unlimited = rate_per_second <= 0.0;
        let max_tokens = if unlimited {
            0.0
        } else {
            f64::from(burst_capacity.max(1))
        };
        Self {
            state: Mutex::new(BucketState {
                tokens: max_tokens,
                last_refill: Instant::now(),
            }),
            max_tokens,
            refill_rate: rate_per_second.max(0.0),
            unlimited,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0.0, 0)
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    pub fn capacity(&self) -> f64 {
        self.max_tokens
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        state.last_refill = now;
    }

    /// Take `n` tokens if they are available right now.
    pub fn try_acquire(&self, n: u32) -> bool {
        if self.unlimited {
            return true;
        }
        let mut state = self.state.lock();
        self.refill(&mut state);
        let wanted = f64::from(n);
        if state.tokens >= wanted {
            state.tokens -= wanted;
            true
        } else {
            false
        }
    }

    /// Wait until `n` tokens are available, take them and return the time
    /// spent waiting. Requests above [`capacity`](Self::capacity) take a full
    /// bucket.
    pub async fn wait_acquire(&self, n: u32) -> Duration {
        if self.unlimited {
            return Duration::ZERO;
        }
        let start = Instant::now();
        let wanted = f64::from(n).min(self.max_tokens);
        loop {
            let wait = {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.tokens >= wanted {
                    state.tokens -= wanted;
                    return start.elapsed();
                }
                let deficit = wanted - state.tokens;
                Duration::from_secs_f64(deficit / self.refill_rate)
            };
            tokio::time::sleep(wait.max(MIN_WAIT)).await;
        }
    }

    /// Tokens currently available; `f64::MAX` when unlimited.
    pub fn available(&self) -> f64 {
        if self.unlimited {
            return f64::MAX;
        }
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens
    }
}
