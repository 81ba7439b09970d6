//! The scheduler loop (§4.4), grounded in the teacher's `Cpus::scheduler` and
//! `garentyler-xv6-riscv`'s `scheduler.rs`.
//!
//! A real context switch (saving/restoring registers and jumping into the chosen process's
//! kernel stack) is out of scope (§1 Non-goals) and is modeled here as an injectable
//! [`ContextSwitch`] hook, so the loop itself can run synchronously under `cargo test`.

use crate::cpu::Cpus;
use crate::process::{ProcessState, ProcessTable};
use crate::runqueue::{RunQueue, SelectCtx};

/// Stands in for the real context-switch primitive. A bare-metal embedding implements this
/// with the teacher's `swtch`; the scenario tests implement it with a plain closure that runs
/// the simulated process body synchronously.
pub trait ContextSwitch {
    fn switch_to(&mut self, idx: usize);
}

impl<F: FnMut(usize)> ContextSwitch for F {
    fn switch_to(&mut self, idx: usize) {
        self(idx)
    }
}

/// A [`ContextSwitch`] that does nothing, for tests that only care about selection order.
pub struct NoopSwitch;

impl ContextSwitch for NoopSwitch {
    fn switch_to(&mut self, _idx: usize) {}
}

/// One iteration of the per-CPU scheduler loop (§4.4's pseudocode): take the table lock, take
/// this CPU's run-queue lock, ask the run queue to pick a victim, promote it to `Running`, and
/// hand control to `switch`. Returns the selected slot index, or `None` if the queue was empty.
#[allow(clippy::too_many_arguments)]
pub fn schedule_once(
    table: &ProcessTable,
    runqueues: &[crate::spinlock::SpinMutex<RunQueue>],
    cpus: &crate::spinlock::SpinMutex<Cpus>,
    context_switches: &std::sync::atomic::AtomicU64,
    cpu_id: usize,
    ticks_now: u64,
    prng: &mut crate::prng::Prng,
    switch: &mut dyn ContextSwitch,
) -> Option<usize> {
    let mut cpus_guard = cpus.lock(cpu_id);
    cpus_guard.get_mut(cpu_id).push_off();
    drop(cpus_guard);

    let chosen = {
        let mut slots = table.lock(cpu_id);
        let mut rq = runqueues[cpu_id].lock(cpu_id);
        let mut ctx = SelectCtx {
            prng,
            ticks_now,
            cpu_id,
            salt: {
                let cpus_guard = cpus.lock(cpu_id);
                cpus_guard.get(cpu_id).iteration
            },
        };
        let chosen = rq.select(&mut slots, &mut ctx);
        if let Some(idx) = chosen {
            crate::process::assert_not_running(&slots[idx], "schedule_once");
            let slot = &mut slots[idx];
            slot.state = ProcessState::Running;
            slot.cpu = Some(cpu_id);
            slot.ticks_scheduled += 1;
            slot.quantum_ticks = 0;
            slot.recent_schedules += 1;
            if let crate::process::SchedMeta::Lottery { boost, .. } = &mut slot.meta {
                *boost = 0;
            }
            slot.last_scheduled = ticks_now;
            if !slot.has_run {
                slot.has_run = true;
                slot.first_run_time = ticks_now;
            }
        }
        chosen
    };

    let mut cpus_guard = cpus.lock(cpu_id);
    let cpu = cpus_guard.get_mut(cpu_id);
    cpu.current = chosen;
    cpu.iteration = cpu.iteration.wrapping_add(1);
    cpu.pop_off();
    drop(cpus_guard);

    if let Some(idx) = chosen {
        context_switches.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        log::debug!("cpu {cpu_id}: switching to slot {idx}");
        switch.switch_to(idx);
    }
    chosen
}
