//! Client-side request throttling
//!
//! A token bucket shared by every worker: `burst` requests may go out
//! back-to-back, after which calls are spaced to the sustained `qps` rate.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use kubestress_common::kube_utils::{TransportConfig, MIN_QPS};

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket rate limiter
#[derive(Debug)]
pub struct Throttle {
    qps: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl Throttle {
    /// Full bucket with the given rate and capacity.
    ///
    /// `qps` is raised to [`MIN_QPS`] so a refill wait always fits a `Duration`.
    pub fn new(qps: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            qps: qps.max(MIN_QPS),
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Throttle matching the transport settings
    pub fn from_transport(transport: &TransportConfig) -> Self {
        Self::new(transport.qps, transport.burst)
    }

    /// Wait until a request may be sent, then consume one token.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.qps).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return;
        }

        // Holding the lock while sleeping keeps waiters in FIFO order
        let wait = Duration::try_from_secs_f64((1.0 - bucket.tokens) / self.qps)
            .unwrap_or(Duration::MAX);
        tokio::time::sleep(wait).await;
        bucket.tokens = 0.0;
        bucket.last_refill = Instant::now();
    }
}
