//! Fixed-window request limiting keyed by caller
//!
//! Each key gets `max_requests` per window. Counters live in process memory,
//! so limits apply per instance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::core::config::RateLimitConfig;

/// Stale windows are dropped once this many keys are tracked
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count one request for `key`; false once the key is over its budget
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        if windows.len() >= PRUNE_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }
}

/// Limiters shared by the API routes
#[derive(Debug, Clone)]
pub struct RateLimiters {
    /// Per bearer credential, on authenticated routes
    pub user: Arc<RateLimiter>,
    /// Per client address, on guest token issuance
    pub guest_token: Arc<RateLimiter>,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            user: Arc::new(RateLimiter::new(config.requests_per_second, Duration::from_secs(1))),
            guest_token: Arc::new(RateLimiter::new(
                config.guest_token_per_second,
                Duration::from_secs(1),
            )),
        }
    }
}
