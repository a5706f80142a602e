// utils/rate_limiter.rs - Token-paced gate for outbound REST calls
//
// Each exchange client owns one limiter (shared via Arc across its REST
// calls). The limiter only paces calls; retrying is the caller's job.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum interval between scheduled calls.
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `requests_per_second` is clamped to at least 0.1 to avoid a zero pace.
    pub fn new(requests_per_second: f64) -> Self {
        let rps = requests_per_second.max(0.1);
        RateLimiter {
            min_interval: Duration::from_millis((1000.0 / rps) as u64),
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for this call's slot, then runs the task.
    /// Concurrent callers are serialized by slot assignment, not by holding
    /// a lock across the task itself.
    pub async fn schedule<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let deadline = self.claim_slot();
        tokio::time::sleep_until(deadline).await;
        task().await
    }

    fn claim_slot(&self) -> Instant {
        let mut slot = self.next_slot.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();
        let at = match *slot {
            Some(t) if t > now => t,
            _ => now,
        };
        *slot = Some(at + self.min_interval);
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_schedule_paces_calls() {
        let limiter = RateLimiter::new(10.0); // 100ms between calls
        let started = Instant::now();

        for _ in 0..3 {
            limiter.schedule(|| async {}).await;
        }

        // First call is immediate, the next two wait 100ms each.
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_calls_are_serialized() {
        let limiter = Arc::new(RateLimiter::new(10.0));
        let started = Instant::now();

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.schedule(|| async {}).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_returns_task_output() {
        let limiter = Arc::new(RateLimiter::new(5.0));
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        let out = limiter
            .schedule(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                42
            })
            .await;

        assert_eq!(out, 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
