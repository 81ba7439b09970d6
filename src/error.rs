//! Error taxonomy (§7). Recoverable errors are represented here; `StateViolation` is
//! fatal by design and is raised with [`fatal`], which panics with the invariant tag,
//! matching the `panic!("sched locks")`-style diagnostics the teacher crates use for the
//! same class of condition.

use core::fmt;

/// Recoverable errors surfaced to a syscall boundary as `Err`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SchedError {
    /// Bad pid, tickets < 1, priority out of range, sleep without lock, out-of-bounds pointer.
    InvalidArgument,
    /// No free process slot, kernel stack allocation failure, run-queue full.
    ResourceExhaustion,
    /// A blocking operation was terminated because the caller was killed.
    Cancelled,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SchedError::InvalidArgument => "invalid argument",
            SchedError::ResourceExhaustion => "resource exhausted",
            SchedError::Cancelled => "operation cancelled: process was killed",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for SchedError {}

pub type Result<T> = core::result::Result<T, SchedError>;

/// Raise a `StateViolation`: a violation of one of invariants I1-I9, or a locking/interrupt
/// discipline breach. These are never recoverable — the kernel halts with the diagnostic
/// identifying the failed invariant, exactly as `sched()` does in every xv6-family teacher
/// crate in the pack (`panic!("sched locks")`, `panic!("sched running")`, ...).
#[track_caller]
pub fn fatal(invariant: &str, detail: &str) -> ! {
    log::error!("state violation [{invariant}]: {detail}");
    panic!("state violation [{invariant}]: {detail}");
}
