//! # Per-Plugin Rate Limiting
//!
//! Token-bucket guards on the two rate-limited channels every plugin
//! owns: host-call frequency (`api-calls`) and persistent-store write
//! frequency (`storage-writes`).
//!
//! ## Semantics
//!
//! `try_consume` is non-blocking: it refills the bucket by elapsed time,
//! then either takes one token and succeeds or leaves the bucket
//! untouched and fails. A failed consume at the dispatch layer produces
//! a neutral `null` reply plus a warning trace, never an error. Buckets
//! are reset to full on plugin unload so a reloaded plugin starts with a
//! clean budget.

use crate::config::RateLimitConfig;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    refilled_at: Instant,
}

/// One token bucket with burst capacity and steady-state refill.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// Take one token if available. Non-blocking.
    pub fn try_consume(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available, after refill.
    pub fn available(&self) -> u32 {
        let mut state = self.state.lock().unwrap();
        self.refill(&mut state);
        state.tokens as u32
    }

    /// Restore the bucket to full capacity.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.tokens = self.capacity as f64;
        state.refilled_at = Instant::now();
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.refilled_at).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity as f64);
            state.refilled_at = now;
        }
    }
}

/// The api-calls and storage-writes buckets carried by one plugin record.
#[derive(Debug)]
pub struct RateLimiterPair {
    pub api_calls: TokenBucket,
    pub storage_writes: TokenBucket,
}

impl RateLimiterPair {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            api_calls: TokenBucket::new(config.api_capacity, config.api_refill_per_sec),
            storage_writes: TokenBucket::new(
                config.storage_capacity,
                config.storage_refill_per_sec,
            ),
        }
    }

    /// Restore both buckets to full capacity; used on unload.
    pub fn reset(&self) {
        self.api_calls.reset();
        self.storage_writes.reset();
    }
}
