//! Runtime-configurable scheduler tunables (SPEC_FULL.md's configuration surface), grounded in
//! the teacher's `param.rs` constant table: the same values, but overridable per [`crate::Kernel`]
//! instance instead of baked in at compile time.

use crate::param::{LOTTERY_STARVATION_BOOST_CAP, LOTTERY_STARVATION_BOOST_INCREMENT};
use crate::policy::Policy;

/// Everything a [`crate::Kernel`] needs beyond the fixed [`Policy`] shape: the policy itself,
/// plus the lottery starvation-boost tunables (§9 Open Questions).
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub policy: Policy,
    /// Per-tick boost accrued by a waiting lottery process (§9).
    pub lottery_starvation_boost_increment: u32,
    /// Cap `boost` saturates at.
    pub lottery_starvation_boost_cap: u32,
}

impl SchedulerConfig {
    /// A config carrying `policy` and the default starvation-boost tunables from `param.rs`.
    pub fn new(policy: Policy) -> SchedulerConfig {
        SchedulerConfig {
            policy,
            lottery_starvation_boost_increment: LOTTERY_STARVATION_BOOST_INCREMENT,
            lottery_starvation_boost_cap: LOTTERY_STARVATION_BOOST_CAP,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig::new(Policy::round_robin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_carries_default_boost_tunables() {
        let config = SchedulerConfig::new(Policy::round_robin());
        assert_eq!(config.lottery_starvation_boost_increment, LOTTERY_STARVATION_BOOST_INCREMENT);
        assert_eq!(config.lottery_starvation_boost_cap, LOTTERY_STARVATION_BOOST_CAP);
    }
}
