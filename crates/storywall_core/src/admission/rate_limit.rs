//! Per-origin request rate limiting.
//!
//! Uses a sliding-window-reset counter: each origin owns one window that
//! restarts at a count of 1 as soon as more than `window_ms` has elapsed
//! since it opened. Within a window every request increments the count and
//! requests beyond `limit` are refused.
//!
//! # Invariants
//! - Check-and-update on one origin's window is atomic with respect to
//!   concurrent callers (the store holds a lock across it).
//! - Every call mutates the origin's window, including refused ones.
//! - Windows idle for longer than `idle_windows * window_ms` are evicted on a
//!   periodic sweep; an evicted origin restarts at 1, which matches what an
//!   elapsed window would have produced anyway.

use super::clock::Clock;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_RATE_LIMIT: u32 = 10;
pub const DEFAULT_RATE_WINDOW_MS: u64 = 60_000;
pub const DEFAULT_SWEEP_EVERY: u64 = 100;
pub const DEFAULT_IDLE_WINDOWS: u64 = 5;

/// Rate limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub limit: u32,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Run an eviction sweep every N checks. `0` disables periodic sweeps.
    pub sweep_every: u64,
    /// Evict windows opened more than `idle_windows * window_ms` ago.
    pub idle_windows: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RATE_LIMIT,
            window_ms: DEFAULT_RATE_WINDOW_MS,
            sweep_every: DEFAULT_SWEEP_EVERY,
            idle_windows: DEFAULT_IDLE_WINDOWS,
        }
    }
}

impl RateLimitConfig {
    fn eviction_age_ms(&self) -> u64 {
        self.window_ms.saturating_mul(self.idle_windows.max(1))
    }
}

/// Admission state for one origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub request_count: u32,
    pub window_start_ms: u64,
}

/// Storage for per-origin windows.
pub trait RateWindowStore: Send + Sync {
    /// Records one request and returns the updated window, atomically.
    fn record_hit(&self, origin_token: &str, now_ms: u64, window_ms: u64) -> RateWindow;
    /// Evicts windows opened more than `max_age_ms` before `now_ms`.
    fn sweep(&self, now_ms: u64, max_age_ms: u64) -> usize;
    /// Number of tracked origins.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local window map behind a mutex.
#[derive(Debug, Default)]
pub struct InMemoryRateWindowStore {
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl InMemoryRateWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current window for `origin_token`, if tracked.
    pub fn window(&self, origin_token: &str) -> Option<RateWindow> {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(origin_token)
            .copied()
    }
}

impl RateWindowStore for InMemoryRateWindowStore {
    fn record_hit(&self, origin_token: &str, now_ms: u64, window_ms: u64) -> RateWindow {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = windows
            .entry(origin_token.to_string())
            .or_insert(RateWindow {
                request_count: 0,
                window_start_ms: now_ms,
            });

        if window.request_count == 0 || now_ms.saturating_sub(window.window_start_ms) > window_ms
        {
            window.request_count = 1;
            window.window_start_ms = now_ms;
        } else {
            window.request_count = window.request_count.saturating_add(1);
        }
        *window
    }

    fn sweep(&self, now_ms: u64, max_age_ms: u64) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, window| now_ms.saturating_sub(window.window_start_ms) <= max_age_ms);
        before - windows.len()
    }

    fn len(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Result of one rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { count: u32 },
    Limited { count: u32, retry_after_ms: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Rate limiter over an injectable window store and clock.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Box<dyn RateWindowStore>,
    clock: Arc<dyn Clock>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(
        config: RateLimitConfig,
        store: Box<dyn RateWindowStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            clock,
            checks: AtomicU64::new(0),
        }
    }

    /// In-memory store on the given clock.
    pub fn in_memory(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config, Box::new(InMemoryRateWindowStore::new()), clock)
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Records a request from `origin_token` and decides whether it may pass.
    pub fn check(&self, origin_token: &str) -> RateDecision {
        let now_ms = self.clock.now_ms();
        self.maybe_sweep(now_ms);

        let window = self
            .store
            .record_hit(origin_token, now_ms, self.config.window_ms);
        if window.request_count > self.config.limit {
            let reopens_at = window
                .window_start_ms
                .saturating_add(self.config.window_ms)
                .saturating_add(1);
            let retry_after_ms = reopens_at.saturating_sub(now_ms);
            warn!(
                "event=rate_limited module=admission status=denied origin={} count={} limit={} retry_after_ms={}",
                super::origin_fingerprint(origin_token),
                window.request_count,
                self.config.limit,
                retry_after_ms
            );
            return RateDecision::Limited {
                count: window.request_count,
                retry_after_ms,
            };
        }

        RateDecision::Allowed {
            count: window.request_count,
        }
    }

    /// Evicts idle windows now; returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let evicted = self
            .store
            .sweep(self.clock.now_ms(), self.config.eviction_age_ms());
        debug!(
            "event=rate_sweep module=admission status=ok evicted={} tracked={}",
            evicted,
            self.store.len()
        );
        evicted
    }

    /// Number of origins currently tracked.
    pub fn tracked_origins(&self) -> usize {
        self.store.len()
    }

    fn maybe_sweep(&self, now_ms: u64) {
        if self.config.sweep_every == 0 {
            return;
        }
        let seen = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % self.config.sweep_every == 0 {
            let evicted = self.store.sweep(now_ms, self.config.eviction_age_ms());
            debug!(
                "event=rate_sweep module=admission status=ok trigger=periodic checks={} evicted={}",
                seen, evicted
            );
        }
    }
}
