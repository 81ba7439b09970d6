//! Tunable constants, grounded in the teacher's `param.rs` constant table.

/// Maximum number of process slots in the table.
pub const NPROC: usize = 64;
/// Maximum number of CPUs.
pub const NCPU: usize = 8;

/// Priority range is inclusive on both ends; 0 is highest.
pub const MIN_PRIORITY: u8 = 0;
pub const MAX_PRIORITY: u8 = 10;

/// Priority at which a freshly forked child is placed in the short-lived lane (§9 Open Questions).
pub const SHORT_LIVED_PRIORITY: u8 = 5;

/// Aging threshold: a waiting process is promoted one band after this many ticks (§4.2).
pub const AGING_THRESHOLD_TICKS: u32 = 50;

/// Time slice (in ticks) for priorities 0-2 vs 3-10 (§4.5).
pub const TIME_SLICE_HIGH_PRIORITY: u32 = 5;
pub const TIME_SLICE_LOW_PRIORITY: u32 = 2;
pub const HIGH_PRIORITY_CUTOFF: u8 = 2;

/// Lottery decay pass cadence (§4.4): every Nth scheduler iteration.
pub const LOTTERY_DECAY_PERIOD: u64 = 100;
pub const LOTTERY_DECAY_NUMERATOR: u32 = 3;
pub const LOTTERY_DECAY_DENOMINATOR: u32 = 4;

/// Default ticket count assigned on allocation (§4.3).
pub const DEFAULT_TICKETS: u32 = 1;
/// Default priority assigned on allocation (§4.3).
pub const DEFAULT_PRIORITY: u8 = 5;

/// Per-tick ticket boost accrued by a lottery process while it waits in its run queue without
/// being selected, and the cap that boost saturates at (§9 Open Questions: dynamic-scaling
/// starvation mitigation for the lottery policy, mirroring priority's aging). The spec calls
/// this an ambiguous, inconsistently-implemented source behavior and says to default it OFF;
/// the increment defaults to `0` so boost never accrues unless a caller opts in via
/// `SchedulerConfig`.
pub const LOTTERY_STARVATION_BOOST_INCREMENT: u32 = 0;
pub const LOTTERY_STARVATION_BOOST_CAP: u32 = 20;
