//! Global token-bucket rate limiter shared across swarm workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Snapshot of limiter activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStats {
    /// Tokens handed out since construction
    pub total_acquired: u64,
    /// Bucket capacity (tokens per second)
    pub capacity: u32,
}

struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Token bucket with capacity R, refilled to R once per second.
///
/// Exactly one structure is shared by all workers of a swarm run; access
/// is serialized by the interior lock, and the wait for the next refill
/// happens outside it. The token count never exceeds capacity and is
/// non-negative after every `acquire`.
pub struct TokenBucket {
    capacity: u32,
    state: Mutex<BucketState>,
    total_acquired: AtomicU64,
}

impl TokenBucket {
    /// Create a full bucket with `capacity` tokens per second.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            total_acquired: AtomicU64::new(0),
        }
    }

    /// Take one token, waiting for the next refill when the bucket is dry.
    ///
    /// The wait is bounded by one second per attempt.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock();
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill);
                if elapsed >= Duration::from_secs(1) {
                    // A full second of refill saturates the bucket.
                    state.tokens = self.capacity;
                    state.last_refill = now;
                }
                if state.tokens > 0 {
                    state.tokens -= 1;
                    self.total_acquired.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Duration::from_secs(1).saturating_sub(elapsed)
            };
            trace!(?wait, "Token bucket dry, waiting for refill");
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            capacity: self.capacity,
        }
    }
}
