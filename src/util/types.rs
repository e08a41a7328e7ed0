//! Shared serializable types.

use serde::{Deserialize, Serialize};

/// Priority band used for queue ordering.
///
/// Lower variants are served first: `Immediate < High < Normal < Low`.
/// `Immediate` never enters a queue; it runs inline at submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Latency-critical call executed inline with no pacing or retry.
    Immediate,
    /// Served ahead of normal traffic.
    High,
    /// Default band for interactive work.
    #[default]
    Normal,
    /// Background work, the default for fire-and-forget submissions.
    Low,
}

impl Priority {
    /// Whether this priority bypasses the bucket queue.
    pub const fn is_inline(self) -> bool {
        matches!(self, Self::Immediate)
    }
}
