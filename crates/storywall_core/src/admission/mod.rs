//! Admission control in front of note creation.
//!
//! # Responsibility
//! - Refuse abusive request volume per origin (rate limit).
//! - Refuse origins that already hold their note quota.
//!
//! # Invariants
//! - The rate check always runs first and always mutates the origin window,
//!   even when the request is refused.
//! - The existing-note lookup is only issued for requests that passed the
//!   rate check.
//! - With `QuotaConsistency::ReadThenWrite` the quota is enforced eventually,
//!   not atomically: concurrent first posts from one origin may overshoot
//!   the cap by one.

pub mod clock;
pub mod quota;
pub mod rate_limit;

pub use clock::{Clock, ManualClock, SystemClock};
pub use quota::{QuotaConsistency, QuotaPolicy, DEFAULT_NOTE_CAP};
pub use rate_limit::{
    InMemoryRateWindowStore, RateDecision, RateLimitConfig, RateLimiter, RateWindow,
    RateWindowStore,
};

use log::info;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Transient; retrying after `retry_after_ms` is expected to succeed.
    RateLimited { retry_after_ms: u64 },
    /// Terminal for the origin.
    QuotaExceeded { cap: u32, existing: u32 },
}

/// Admission verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny(DenyReason),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Shared gatekeeper; one instance per process, used from every request.
pub struct AdmissionController {
    limiter: RateLimiter,
    quota: QuotaPolicy,
}

impl AdmissionController {
    pub fn new(limiter: RateLimiter, quota: QuotaPolicy) -> Self {
        Self { limiter, quota }
    }

    pub fn quota(&self) -> QuotaPolicy {
        self.quota
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Rate check only. Used when the quota is enforced by the store.
    pub fn check_rate(&self, origin_token: &str) -> Admission {
        match self.limiter.check(origin_token) {
            RateDecision::Allowed { .. } => Admission::Allow,
            RateDecision::Limited { retry_after_ms, .. } => {
                Admission::Deny(DenyReason::RateLimited { retry_after_ms })
            }
        }
    }

    /// Full admission check.
    ///
    /// `existing_notes` is invoked only when the rate check passes; its error
    /// is returned unchanged.
    pub fn check_admission<E>(
        &self,
        origin_token: &str,
        existing_notes: impl FnOnce() -> Result<u32, E>,
    ) -> Result<Admission, E> {
        if let deny @ Admission::Deny(_) = self.check_rate(origin_token) {
            return Ok(deny);
        }

        let existing = existing_notes()?;
        Ok(self.quota_verdict(origin_token, existing))
    }

    /// Full admission check with an already known note count.
    pub fn check_admission_with_count(&self, origin_token: &str, existing: u32) -> Admission {
        match self.check_admission(origin_token, || Ok::<u32, std::convert::Infallible>(existing))
        {
            Ok(admission) => admission,
            Err(never) => match never {},
        }
    }

    fn quota_verdict(&self, origin_token: &str, existing: u32) -> Admission {
        if self.quota.is_exhausted(existing) {
            info!(
                "event=quota_exceeded module=admission status=denied origin={} existing={} cap={}",
                origin_fingerprint(origin_token),
                existing,
                self.quota.cap
            );
            return Admission::Deny(DenyReason::QuotaExceeded {
                cap: self.quota.cap,
                existing,
            });
        }
        Admission::Allow
    }
}

/// Short, non-reversible tag for an origin token, safe to put in logs.
pub fn origin_fingerprint(origin_token: &str) -> String {
    let mut hasher = DefaultHasher::new();
    origin_token.hash(&mut hasher);
    format!("{:08x}", hasher.finish() & 0xffff_ffff)
}
