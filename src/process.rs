//! The process state machine and the process table (§3, §4.3), grounded in the teacher's
//! `Proc`/`ProcList` and `garentyler-xv6-riscv`'s `Process`/`ProcessError`.

use crate::error::{fatal, SchedError, Result};
use crate::param::{DEFAULT_PRIORITY, DEFAULT_TICKETS, NPROC};
use crate::spinlock::SpinMutex;
use std::sync::atomic::{AtomicI32, Ordering};

/// The six legal process states (§3).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ProcessState {
    #[default]
    Unused,
    Embryo,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

/// Policy-specific scheduling metadata (§3). Exactly one variant is live at a time, matching
/// whichever [`crate::policy::Policy`] the [`crate::Kernel`] was constructed with.
#[derive(Copy, Clone, Debug)]
pub enum SchedMeta {
    Lottery { tickets: u32, boost: u32 },
    Priority { priority: u8, wait_ticks: u32 },
    RoundRobin,
}

impl SchedMeta {
    pub fn tickets(&self) -> Option<u32> {
        match self {
            SchedMeta::Lottery { tickets, .. } => Some(*tickets),
            _ => None,
        }
    }

    /// `tickets + boost` (§4.2 step 1: the draw sums this, not raw `tickets`, so a
    /// starvation-boosted process gets a temporarily larger share without `tickets` itself
    /// ever changing).
    pub fn effective_tickets(&self) -> Option<u32> {
        match self {
            SchedMeta::Lottery { tickets, boost } => Some(tickets.saturating_add(*boost)),
            _ => None,
        }
    }

    pub fn priority(&self) -> Option<u8> {
        match self {
            SchedMeta::Priority { priority, .. } => Some(*priority),
            _ => None,
        }
    }
}

/// One process-table slot. Every cross-slot reference (`parent`, run-queue membership, a
/// CPU's current process) is a plain slot index (§3 "Slot-index modeling"), never a smart
/// pointer into another slot.
#[derive(Clone, Debug)]
pub struct ProcessSlot {
    pub state: ProcessState,
    pub pid: i32,
    /// Weak reference: the parent's slot index. Never owning.
    pub parent: Option<usize>,
    pub killed: bool,
    /// Opaque sleep key (I3). `None` iff not sleeping.
    pub chan: Option<u64>,
    pub name: String,
    /// Home CPU (I4). `None` iff the slot has never been assigned one.
    pub cpu: Option<usize>,
    pub meta: SchedMeta,

    // Timing/statistics counters (§3, carried by every policy variant).
    /// Total number of times this process has been selected to run (§3). Incremented once per
    /// selection; never reset.
    pub ticks_scheduled: u64,
    /// Ticks elapsed in the current quantum since the last selection. Reset to `0` every time
    /// the process is selected, and compared against the policy's time slice to decide
    /// preemption (§4.5). Distinct from `ticks_scheduled`, which never resets.
    pub quantum_ticks: u64,
    pub recent_schedules: u32,
    pub last_scheduled: u64,
    pub creation_time: u64,
    pub first_run_time: u64,
    pub has_run: bool,
    pub waiting_time: u64,
    pub completion_time: u64,
    pub cpu_time: u64,
    pub exit_status: i32,

    /// Opaque process memory image size, standing in for the page table (§3, §6 `sbrk`).
    pub mem_size: i64,
}

impl ProcessSlot {
    const fn empty() -> ProcessSlot {
        ProcessSlot {
            state: ProcessState::Unused,
            pid: 0,
            parent: None,
            killed: false,
            chan: None,
            name: String::new(),
            cpu: None,
            meta: SchedMeta::RoundRobin,
            ticks_scheduled: 0,
            quantum_ticks: 0,
            recent_schedules: 0,
            last_scheduled: 0,
            creation_time: 0,
            first_run_time: 0,
            has_run: false,
            waiting_time: 0,
            completion_time: 0,
            cpu_time: 0,
            exit_status: 0,
            mem_size: 0,
        }
    }

    fn reset_to_unused(&mut self) {
        *self = ProcessSlot::empty();
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }
}

/// Fixed-capacity process table (§4.3), guarded by the single global process-table lock
/// §5 names (see SPEC_FULL.md's Design Notes for why this crate has one table lock rather
/// than the teacher's per-process locks plus a separate `wait_lock`).
pub struct ProcessTable {
    slots: SpinMutex<Box<[ProcessSlot; NPROC]>>,
    next_pid: AtomicI32,
}

impl ProcessTable {
    pub fn new() -> ProcessTable {
        let slots: [ProcessSlot; NPROC] = core::array::from_fn(|_| ProcessSlot::empty());
        ProcessTable {
            slots: SpinMutex::new("ptable", Box::new(slots)),
            next_pid: AtomicI32::new(1),
        }
    }

    pub fn lock(&self, cpu_id: usize) -> crate::spinlock::SpinMutexGuard<'_, Box<[ProcessSlot; NPROC]>> {
        self.slots.lock(cpu_id)
    }

    fn alloc_pid(&self) -> i32 {
        self.next_pid.fetch_add(1, Ordering::SeqCst)
    }

    /// Scan for an `Unused` slot, transition it to `Embryo`, and assign a fresh pid
    /// (§4.3). Defaults scheduling metadata per the active policy's default shape.
    pub fn alloc(&self, cpu_id: usize, default_meta: SchedMeta, now: u64, name: &str) -> Result<usize> {
        let mut slots = self.lock(cpu_id);
        let idx = slots.iter().position(|p| p.state == ProcessState::Unused);
        let Some(idx) = idx else {
            log::warn!("process table exhausted (NPROC = {NPROC})");
            return Err(SchedError::ResourceExhaustion);
        };
        let pid = self.alloc_pid();
        let slot = &mut slots[idx];
        slot.state = ProcessState::Embryo;
        slot.pid = pid;
        slot.meta = default_meta;
        slot.creation_time = now;
        slot.name = name.to_string();
        log::info!("alloc: pid {pid} -> slot {idx}");
        Ok(idx)
    }

    /// Free a slot's fields and return it to `Unused` (I8). Caller must already hold the
    /// table lock and have verified the slot is a reaped `Zombie`.
    pub fn free_locked(slots: &mut [ProcessSlot; NPROC], idx: usize) {
        let pid = slots[idx].pid;
        slots[idx].reset_to_unused();
        log::info!("free: slot {idx} (was pid {pid})");
    }

    /// Default scheduling metadata for a fresh allocation (§4.3: tickets=1 / priority=5 / none).
    pub fn default_meta(policy: &crate::policy::Policy) -> SchedMeta {
        match policy {
            crate::policy::Policy::Lottery { .. } => SchedMeta::Lottery {
                tickets: DEFAULT_TICKETS,
                boost: 0,
            },
            crate::policy::Policy::Priority { .. } => SchedMeta::Priority {
                priority: DEFAULT_PRIORITY,
                wait_ticks: 0,
            },
            crate::policy::Policy::RoundRobin => SchedMeta::RoundRobin,
        }
    }

    /// Re-parent every child of `parent_idx` to `init_idx` (§4.3 `exit`). Caller holds the
    /// table lock.
    pub fn reparent_locked(slots: &mut [ProcessSlot; NPROC], parent_idx: usize, init_idx: usize) -> Vec<usize> {
        let mut reparented = Vec::new();
        for (i, slot) in slots.iter_mut().enumerate() {
            if slot.state != ProcessState::Unused && slot.parent == Some(parent_idx) {
                slot.parent = Some(init_idx);
                reparented.push(i);
            }
        }
        reparented
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        ProcessTable::new()
    }
}

/// Assert invariant I1/I7-shaped preconditions the way the teacher's `sched()` does with
/// `panic!("sched running")`. Kept as a free function so every call site (scheduler, sleep,
/// yield) gets an identical diagnostic.
pub fn assert_not_running(slot: &ProcessSlot, where_: &str) {
    if slot.state == ProcessState::Running {
        fatal("I1", &format!("{where_}: process is still Running"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;

    #[test]
    fn alloc_assigns_fresh_pid_and_embryo_state() {
        let table = ProcessTable::new();
        let policy = Policy::RoundRobin;
        let idx = table.alloc(0, ProcessTable::default_meta(&policy), 0, "p0").unwrap();
        let slots = table.lock(0);
        assert_eq!(slots[idx].state, ProcessState::Embryo);
        assert!(slots[idx].pid >= 1);
    }

    #[test]
    fn alloc_exhaustion_is_resource_exhaustion() {
        let table = ProcessTable::new();
        let policy = Policy::RoundRobin;
        for _ in 0..NPROC {
            table.alloc(0, ProcessTable::default_meta(&policy), 0, "p").unwrap();
        }
        let err = table.alloc(0, ProcessTable::default_meta(&policy), 0, "overflow").unwrap_err();
        assert_eq!(err, SchedError::ResourceExhaustion);
    }

    #[test]
    fn free_locked_resets_all_fields() {
        let table = ProcessTable::new();
        let policy = Policy::RoundRobin;
        let idx = table.alloc(0, ProcessTable::default_meta(&policy), 0, "p0").unwrap();
        {
            let mut slots = table.lock(0);
            slots[idx].state = ProcessState::Zombie;
            slots[idx].killed = true;
            ProcessTable::free_locked(&mut slots, idx);
        }
        let slots = table.lock(0);
        assert_eq!(slots[idx].state, ProcessState::Unused);
        assert_eq!(slots[idx].pid, 0);
        assert!(!slots[idx].killed);
    }

    #[test]
    fn reparent_moves_children_to_init() {
        let table = ProcessTable::new();
        let policy = Policy::RoundRobin;
        let init = table.alloc(0, ProcessTable::default_meta(&policy), 0, "init").unwrap();
        let parent = table.alloc(0, ProcessTable::default_meta(&policy), 0, "parent").unwrap();
        let child = table.alloc(0, ProcessTable::default_meta(&policy), 0, "child").unwrap();
        {
            let mut slots = table.lock(0);
            slots[child].parent = Some(parent);
        }
        {
            let mut slots = table.lock(0);
            ProcessTable::reparent_locked(&mut slots, parent, init);
        }
        let slots = table.lock(0);
        assert_eq!(slots[child].parent, Some(init));
    }
}
