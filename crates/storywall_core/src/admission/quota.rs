//! Per-origin note quota.

/// Notes one origin may ever create unless configured otherwise.
pub const DEFAULT_NOTE_CAP: u32 = 1;

/// How the quota check and the insert are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuotaConsistency {
    /// Count, then insert in a separate step. Two concurrent first posts from
    /// one origin may both pass, overshooting the cap by one.
    #[default]
    ReadThenWrite,
    /// Count and insert inside one store transaction.
    Atomic,
}

impl QuotaConsistency {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read_then_write" | "eventual" => Some(Self::ReadThenWrite),
            "atomic" | "strict" => Some(Self::Atomic),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadThenWrite => "read_then_write",
            Self::Atomic => "atomic",
        }
    }
}

/// Quota settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub cap: u32,
    pub consistency: QuotaConsistency,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            cap: DEFAULT_NOTE_CAP,
            consistency: QuotaConsistency::default(),
        }
    }
}

impl QuotaPolicy {
    /// Whether an origin already holding `existing` notes is at its cap.
    pub fn is_exhausted(&self, existing: u32) -> bool {
        existing >= self.cap
    }
}
