//! Pluggable scheduling policies (§4.1-§4.3), selected once at [`crate::Kernel`] construction
//! and fixed for the system's lifetime (§3: "the active policy is a single fixed choice").

use crate::param::{AGING_THRESHOLD_TICKS, LOTTERY_DECAY_PERIOD};

/// Which of the three scheduling disciplines this kernel instance runs.
#[derive(Copy, Clone, Debug)]
pub enum Policy {
    /// Weighted random selection by ticket count (§4.1).
    Lottery { decay_period: u64 },
    /// Strict priority bands with anti-starvation aging (§4.2).
    Priority { aging_threshold: u32 },
    /// Single FIFO band, unconditional preemption each tick (§4.2 "modeled as one uniform
    /// band under the same run-queue trait the other two policies use").
    RoundRobin,
}

impl Policy {
    pub fn lottery() -> Policy {
        Policy::Lottery {
            decay_period: LOTTERY_DECAY_PERIOD,
        }
    }

    pub fn priority() -> Policy {
        Policy::Priority {
            aging_threshold: AGING_THRESHOLD_TICKS,
        }
    }

    pub fn round_robin() -> Policy {
        Policy::RoundRobin
    }

    pub fn name(&self) -> &'static str {
        match self {
            Policy::Lottery { .. } => "lottery",
            Policy::Priority { .. } => "priority",
            Policy::RoundRobin => "round-robin",
        }
    }
}
