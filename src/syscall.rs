//! The process-lifecycle syscall surface (§6), grounded in `garentyler-xv6-riscv`'s
//! `Process::alloc`/`fork`/`exit`/`wait_for_child`/`kill` (the teacher's own `proc.rs` stops
//! short of these, so this module leans on the sibling example repo for their shape).

use crate::error::{Result, SchedError};
use crate::process::ProcessState;
use crate::sleepwake;
use crate::Kernel;

/// What `wait` found. A real blocking wait loops `wait` until it sees `Reaped`; this crate
/// only owns the state transition (§1 Non-goals: actual suspension is the embedding's job).
#[derive(Debug, Eq, PartialEq)]
pub enum WaitOutcome {
    Reaped { pid: i32, exit_status: i32 },
    /// At least one child exists but none have exited yet. The caller slot has been put to
    /// sleep on that child-set's wait channel; call `wait` again after being woken.
    Blocked,
}

fn wait_chan(parent_idx: usize) -> u64 {
    0x8000_0000_0000_0000 | parent_idx as u64
}

impl Kernel {
    /// Allocate a fresh process (§4.3 `alloc`, via the table) and enqueue it (§4.2's
    /// `on_enqueue`). Used both for the very first process and for `fork`'s child.
    pub fn spawn(&self, cpu_id: usize, name: &str, parent: Option<usize>) -> Result<usize> {
        let now = self.ticks();
        let meta = crate::process::ProcessTable::default_meta(&self.config().policy);
        let idx = self.table.alloc(cpu_id, meta, now, name)?;
        let target = self.least_loaded_cpu(cpu_id);
        {
            let mut slots = self.table.lock(cpu_id);
            slots[idx].parent = parent;
            slots[idx].state = ProcessState::Runnable;
            slots[idx].cpu = Some(target);
        }
        {
            let slots = self.table.lock(cpu_id);
            self.runqueues[target].lock(cpu_id).add(idx, &slots[..]);
        }
        log::info!("spawn: slot {idx} ({name}) -> cpu {target}");
        Ok(idx)
    }

    /// Duplicate `parent_idx` into a new slot (§6 `fork`). Scheduling metadata and the memory
    /// image size are inherited; everything else (timing counters, pid) starts fresh.
    pub fn fork(&self, cpu_id: usize, parent_idx: usize) -> Result<usize> {
        let now = self.ticks();
        let (parent_meta, parent_mem, parent_name) = {
            let slots = self.table.lock(cpu_id);
            if slots[parent_idx].state == ProcessState::Unused {
                return Err(SchedError::InvalidArgument);
            }
            (slots[parent_idx].meta, slots[parent_idx].mem_size, slots[parent_idx].name.clone())
        };
        let idx = self.table.alloc(cpu_id, parent_meta, now, &parent_name)?;
        let target = self.least_loaded_cpu(cpu_id);
        {
            let mut slots = self.table.lock(cpu_id);
            slots[idx].parent = Some(parent_idx);
            slots[idx].mem_size = parent_mem;
            slots[idx].state = ProcessState::Runnable;
            slots[idx].cpu = Some(target);
        }
        {
            let slots = self.table.lock(cpu_id);
            self.runqueues[target].lock(cpu_id).add(idx, &slots[..]);
        }
        log::info!("fork: slot {parent_idx} -> slot {idx} on cpu {target}");
        Ok(idx)
    }

    /// Terminate `idx` (§6 `exit`): reparent its children to `init`, mark it `Zombie`, and
    /// wake whoever is waiting on it.
    pub fn exit(&self, cpu_id: usize, idx: usize, exit_status: i32) {
        let now = self.ticks();
        let parent = {
            let mut slots = self.table.lock(cpu_id);
            let init = self.init_slot.load(std::sync::atomic::Ordering::Relaxed);
            if init != usize::MAX && init != idx {
                crate::process::ProcessTable::reparent_locked(&mut slots, idx, init);
            }
            slots[idx].state = ProcessState::Zombie;
            slots[idx].exit_status = exit_status;
            slots[idx].completion_time = now;
            slots[idx].cpu = None;
            slots[idx].parent
        };
        self.runqueues[cpu_id].lock(cpu_id).remove(idx);
        if let Some(parent_idx) = parent {
            sleepwake::wakeup(&self.table, &self.runqueues, cpu_id, wait_chan(parent_idx));
        }
        log::info!("exit: slot {idx} status {exit_status}");
    }

    /// Reap one zombie child of `parent_idx`, or block the caller if children remain alive
    /// (§6 `wait`). Returns `Err(Cancelled)` if `parent_idx` itself has been killed, or
    /// `Err(InvalidArgument)` if it has no children at all.
    pub fn wait(&self, cpu_id: usize, parent_idx: usize) -> Result<WaitOutcome> {
        let mut slots = self.table.lock(cpu_id);
        if slots[parent_idx].killed {
            return Err(SchedError::Cancelled);
        }
        let mut any_children = false;
        let mut zombie = None;
        for (i, slot) in slots.iter().enumerate() {
            if slot.parent == Some(parent_idx) && slot.state != ProcessState::Unused {
                any_children = true;
                if slot.state == ProcessState::Zombie {
                    zombie = Some(i);
                    break;
                }
            }
        }
        if let Some(child) = zombie {
            let pid = slots[child].pid;
            let exit_status = slots[child].exit_status;
            crate::process::ProcessTable::free_locked(&mut slots, child);
            return Ok(WaitOutcome::Reaped { pid, exit_status });
        }
        if !any_children {
            return Err(SchedError::InvalidArgument);
        }
        sleepwake::sleep(&mut slots, parent_idx, wait_chan(parent_idx));
        Ok(WaitOutcome::Blocked)
    }

    /// Mark `pid` killed (§6 `kill`). Wakes it if it was sleeping (I9: wake-on-kill is a
    /// spurious wakeup the sleeper must tolerate and re-check `is_killed` after).
    pub fn kill(&self, cpu_id: usize, pid: i32) -> Result<()> {
        let (idx, was_sleeping, chan) = {
            let mut slots = self.table.lock(cpu_id);
            let idx = slots.iter().position(|p| p.pid == pid && p.state != ProcessState::Unused);
            let Some(idx) = idx else {
                return Err(SchedError::InvalidArgument);
            };
            slots[idx].killed = true;
            let was_sleeping = slots[idx].state == ProcessState::Sleeping;
            (idx, was_sleeping, slots[idx].chan)
        };
        if was_sleeping {
            if let Some(chan) = chan {
                sleepwake::wakeup(&self.table, &self.runqueues, cpu_id, chan);
            }
        }
        log::info!("kill: pid {pid} (slot {idx})");
        Ok(())
    }

    pub fn is_killed(&self, cpu_id: usize, idx: usize) -> bool {
        self.table.lock(cpu_id)[idx].killed
    }

    /// Voluntary yield (§6): Running -> Runnable, back onto this CPU's run queue.
    pub fn yield_now(&self, cpu_id: usize, idx: usize) {
        let mut slots = self.table.lock(cpu_id);
        slots[idx].state = ProcessState::Runnable;
        slots[idx].cpu = None;
        self.runqueues[cpu_id].lock(cpu_id).add(idx, &slots[..]);
    }

    /// Grow or shrink the opaque memory image (§6 `sbrk`). Returns the size before the
    /// adjustment. Rejects shrinking below zero.
    pub fn sbrk(&self, cpu_id: usize, idx: usize, increment: i64) -> Result<i64> {
        let mut slots = self.table.lock(cpu_id);
        let old = slots[idx].mem_size;
        let new = old + increment;
        if new < 0 {
            return Err(SchedError::InvalidArgument);
        }
        slots[idx].mem_size = new;
        Ok(old)
    }

    pub fn getpid(&self, cpu_id: usize, idx: usize) -> i32 {
        self.table.lock(cpu_id)[idx].pid
    }

    pub fn mark_init(&self, idx: usize) {
        self.init_slot.store(idx, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;

    #[test]
    fn fork_exit_wait_round_trips() {
        let k = Kernel::new(Policy::round_robin());
        let parent = k.spawn(0, "parent", None).unwrap();
        k.mark_init(parent);
        let child = k.fork(0, parent).unwrap();
        let child_pid = k.getpid(0, child);

        assert_eq!(k.wait(0, parent), Ok(WaitOutcome::Blocked));
        k.exit(0, child, 7);
        match k.wait(0, parent) {
            Ok(WaitOutcome::Reaped { pid, exit_status }) => {
                assert_eq!(pid, child_pid);
                assert_eq!(exit_status, 7);
            }
            other => panic!("expected Reaped, got {other:?}"),
        }
        assert_eq!(k.wait(0, parent), Err(SchedError::InvalidArgument));
    }

    #[test]
    fn kill_wakes_a_sleeper() {
        let k = Kernel::new(Policy::round_robin());
        let idx = k.spawn(0, "sleeper", None).unwrap();
        let pid = k.getpid(0, idx);
        {
            let mut slots = k.table.lock(0);
            slots[idx].state = ProcessState::Running;
            sleepwake::sleep(&mut slots, idx, 99);
        }
        k.kill(0, pid).unwrap();
        assert!(k.is_killed(0, idx));
        assert_eq!(k.table.lock(0)[idx].state, ProcessState::Runnable);
    }

    #[test]
    fn wait_on_a_killed_parent_is_cancelled() {
        let k = Kernel::new(Policy::round_robin());
        let parent = k.spawn(0, "parent", None).unwrap();
        let pid = k.getpid(0, parent);
        k.kill(0, pid).unwrap();
        assert_eq!(k.wait(0, parent), Err(SchedError::Cancelled));
    }

    #[test]
    fn spawn_assigns_a_home_cpu_and_balances_load() {
        let k = Kernel::new(Policy::round_robin());
        let first = k.spawn(0, "a", None).unwrap();
        let second = k.spawn(0, "b", None).unwrap();
        let first_cpu = k.table.lock(0)[first].cpu;
        let second_cpu = k.table.lock(0)[second].cpu;
        assert!(first_cpu.is_some());
        assert!(second_cpu.is_some());
        assert_ne!(first_cpu, second_cpu);
    }

    #[test]
    fn sbrk_rejects_negative_result() {
        let k = Kernel::new(Policy::round_robin());
        let idx = k.spawn(0, "p", None).unwrap();
        assert_eq!(k.sbrk(0, idx, -1), Err(SchedError::InvalidArgument));
        k.sbrk(0, idx, 4096).unwrap();
        assert_eq!(k.sbrk(0, idx, -100).unwrap(), 4096);
    }
}
