//! Sleep/wake (§4.6), grounded in the teacher's `sleep`/`wakeup` in `proc.rs`.
//!
//! The teacher's `sleep` releases the caller's lock, takes the process-table lock, parks, then
//! re-takes the caller's lock on the way out -- a dance needed only because it has a *second*
//! process lock to juggle. With a single process-table lock (§5), both `sleep` and `wakeup` are
//! just state transitions performed while already holding it; suspending and resuming the
//! calling process's own control flow is the embedding's job (§1 Non-goals), so these functions
//! only touch the data structures, matching `original_source/*/proc.c`'s `sleep`/`wakeup` core.

use crate::process::{ProcessState, ProcessTable};
use crate::runqueue::RunQueue;
use crate::spinlock::SpinMutex;

/// Put `idx` to sleep on `chan` (I3). Caller must already hold the process-table lock for the
/// slot, i.e. call this from inside a `table.lock(cpu_id)` critical section. Removing the
/// process from its run queue is the caller's job if it was Runnable rather than Running.
pub fn sleep(slots: &mut [crate::process::ProcessSlot], idx: usize, chan: u64) {
    crate::process::assert_not_running(&slots[idx], "sleep");
    slots[idx].state = ProcessState::Sleeping;
    slots[idx].chan = Some(chan);
    log::trace!("pid {} sleeping on chan {chan:#x}", slots[idx].pid);
}

/// Wake every process sleeping on `chan` (I3, I9: spurious wakeups are tolerated by design,
/// since a waiter always re-checks its condition after `sleep` returns). Moves each one to
/// `Runnable` and enqueues it onto the given CPU's run queue.
pub fn wakeup(
    table: &ProcessTable,
    runqueues: &[SpinMutex<RunQueue>],
    cpu_id: usize,
    chan: u64,
) -> Vec<usize> {
    let mut woken = Vec::new();
    let mut slots = table.lock(cpu_id);
    for (i, slot) in slots.iter_mut().enumerate() {
        if slot.state == ProcessState::Sleeping && slot.chan == Some(chan) {
            slot.state = ProcessState::Runnable;
            slot.chan = None;
            woken.push(i);
        }
    }
    drop(slots);
    if !woken.is_empty() {
        let slots = table.lock(cpu_id);
        let mut rq = runqueues[cpu_id].lock(cpu_id);
        for &idx in &woken {
            rq.add(idx, &slots[..]);
        }
    }
    log::trace!("wakeup(chan={chan:#x}) woke {} process(es)", woken.len());
    woken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::NCPU;
    use crate::policy::Policy;

    #[test]
    fn sleep_then_wakeup_round_trips_to_runnable() {
        let policy = Policy::round_robin();
        let table = ProcessTable::new();
        let idx = table
            .alloc(0, ProcessTable::default_meta(&policy), 0, "sleeper")
            .unwrap();
        {
            let mut slots = table.lock(0);
            slots[idx].state = ProcessState::Running;
            sleep(&mut slots, idx, 0xCAFE);
        }
        let runqueues: Vec<SpinMutex<RunQueue>> = (0..NCPU)
            .map(|_| SpinMutex::new("rq", RunQueue::for_policy(&policy)))
            .collect();
        let woken = wakeup(&table, &runqueues, 0, 0xCAFE);
        assert_eq!(woken, vec![idx]);
        let slots = table.lock(0);
        assert_eq!(slots[idx].state, ProcessState::Runnable);
        assert!(slots[idx].chan.is_none());
    }

    #[test]
    fn wakeup_ignores_different_channel() {
        let policy = Policy::round_robin();
        let table = ProcessTable::new();
        let idx = table
            .alloc(0, ProcessTable::default_meta(&policy), 0, "sleeper")
            .unwrap();
        {
            let mut slots = table.lock(0);
            slots[idx].state = ProcessState::Running;
            sleep(&mut slots, idx, 1);
        }
        let runqueues: Vec<SpinMutex<RunQueue>> = (0..NCPU)
            .map(|_| SpinMutex::new("rq", RunQueue::for_policy(&policy)))
            .collect();
        let woken = wakeup(&table, &runqueues, 0, 2);
        assert!(woken.is_empty());
        let slots = table.lock(0);
        assert_eq!(slots[idx].state, ProcessState::Sleeping);
    }
}
