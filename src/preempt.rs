//! Timer-tick handling (§4.5): per-tick bookkeeping, priority aging, lottery ticket decay, and
//! the preemption decision, grounded in `original_source/priority-scheduler/runqueue.c`'s aging
//! pass and `rand.c`'s implicit "time passes" model for the lottery decay.

use crate::config::SchedulerConfig;
use crate::cpu::Cpus;
use crate::param::{LOTTERY_DECAY_DENOMINATOR, LOTTERY_DECAY_NUMERATOR};
use crate::process::{ProcessState, ProcessTable, SchedMeta};
use crate::runqueue::{PriorityQueue, RunQueue};
use crate::spinlock::SpinMutex;

/// Advance the clock by one tick on `cpu_id` (§4.5). Charges the currently running process
/// (if any), ages every other waiting process under the priority policy, decays lottery
/// `recent_schedules` and accrues starvation boost on schedule, and preempts the running
/// process back onto its run queue if its slice (or the policy's unconditional rule) says to.
pub fn tick(
    table: &ProcessTable,
    runqueues: &[SpinMutex<RunQueue>],
    cpus: &SpinMutex<Cpus>,
    config: &SchedulerConfig,
    cpu_id: usize,
    ticks_now: u64,
) {
    let mut cpus_guard = cpus.lock(cpu_id);
    let cpu = cpus_guard.get_mut(cpu_id);
    cpu.push_off();
    let running = cpu.current;
    drop(cpus_guard);

    let mut slots = table.lock(cpu_id);
    let mut rq = runqueues[cpu_id].lock(cpu_id);

    if let RunQueue::Priority(pq) = &mut *rq {
        let aging_threshold = match &config.policy {
            crate::policy::Policy::Priority { aging_threshold } => *aging_threshold,
            _ => crate::param::AGING_THRESHOLD_TICKS,
        };
        age_waiting(pq, &mut slots, running, aging_threshold);
    }

    if let RunQueue::Lottery(lq) = &mut *rq {
        lq.accrue_starvation_boost(
            &mut slots,
            config.lottery_starvation_boost_increment,
            config.lottery_starvation_boost_cap,
        );
        if let crate::policy::Policy::Lottery { decay_period } = &config.policy {
            if *decay_period != 0 && ticks_now % decay_period == 0 && ticks_now != 0 {
                lq.decay_recent_schedules(&mut slots, LOTTERY_DECAY_NUMERATOR, LOTTERY_DECAY_DENOMINATOR);
            }
        }
    }

    let mut preempted = None;
    if let Some(idx) = running {
        let slot = &mut slots[idx];
        slot.quantum_ticks += 1;
        slot.cpu_time += 1;
        if rq.should_preempt(slot) {
            slot.state = ProcessState::Runnable;
            slot.cpu = None;
            preempted = Some(idx);
        }
    }
    if let Some(idx) = preempted {
        rq.add(idx, &slots[..]);
    }
    drop(rq);
    drop(slots);

    let mut cpus_guard = cpus.lock(cpu_id);
    let cpu = cpus_guard.get_mut(cpu_id);
    if preempted.is_some() {
        cpu.current = None;
    }
    cpu.pop_off();
}

/// Increment `wait_ticks` for everyone in the priority queue except the currently running
/// process, then promote anyone who crossed the aging threshold.
fn age_waiting(
    pq: &mut PriorityQueue,
    slots: &mut [crate::process::ProcessSlot],
    running: Option<usize>,
    aging_threshold: u32,
) {
    let waiting: Vec<usize> = pq.waiting_members().filter(|&idx| Some(idx) != running).collect();
    for idx in waiting {
        if let SchedMeta::Priority { wait_ticks, .. } = &mut slots[idx].meta {
            *wait_ticks += 1;
        }
        slots[idx].waiting_time += 1;
    }
    pq.age(slots, aging_threshold);
}
