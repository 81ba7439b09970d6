//! The statistics/introspection surface (§4.7, §6), grounded in the teacher's `proc_dump` and
//! xv6's traditional `getpinfo` syscall shape.

use crate::error::{Result, SchedError};
use crate::process::{ProcessState, ProcessTable};

/// A point-in-time snapshot of one process, the shape `getpinfo` hands back to user space.
#[derive(Clone, Debug)]
pub struct ProcInfo {
    pub pid: i32,
    pub name: String,
    pub state: ProcessState,
    pub parent_pid: Option<i32>,
    pub cpu: Option<usize>,
    pub tickets: Option<u32>,
    pub priority: Option<u8>,
    pub ticks_scheduled: u64,
    pub recent_schedules: u32,
    pub waiting_time: u64,
    pub cpu_time: u64,
    pub creation_time: u64,
}

/// Snapshot every live (non-`Unused`) slot (§4.7).
pub fn getpinfo(table: &ProcessTable, cpu_id: usize) -> Vec<ProcInfo> {
    let slots = table.lock(cpu_id);
    let mut out = Vec::new();
    for slot in slots.iter() {
        if slot.state == ProcessState::Unused {
            continue;
        }
        let parent_pid = slot.parent.map(|p| slots[p].pid);
        out.push(ProcInfo {
            pid: slot.pid,
            name: slot.name.clone(),
            state: slot.state,
            parent_pid,
            cpu: slot.cpu,
            tickets: slot.meta.tickets(),
            priority: slot.meta.priority(),
            ticks_scheduled: slot.ticks_scheduled,
            recent_schedules: slot.recent_schedules,
            waiting_time: slot.waiting_time,
            cpu_time: slot.cpu_time,
            creation_time: slot.creation_time,
        });
    }
    out
}

/// Snapshot a single pid, or `None` if it no longer exists.
pub fn getpinfo_one(table: &ProcessTable, cpu_id: usize, pid: i32) -> Option<ProcInfo> {
    getpinfo(table, cpu_id).into_iter().find(|p| p.pid == pid)
}

/// Set a lottery process's ticket count (§4.7, §6). Rejects `tickets < 1` (I6).
pub fn settickets(table: &ProcessTable, cpu_id: usize, pid: i32, tickets: u32) -> Result<()> {
    if tickets < 1 {
        return Err(SchedError::InvalidArgument);
    }
    let mut slots = table.lock(cpu_id);
    let idx = slots.iter().position(|p| p.pid == pid && p.state != ProcessState::Unused);
    let Some(idx) = idx else {
        return Err(SchedError::InvalidArgument);
    };
    match &mut slots[idx].meta {
        crate::process::SchedMeta::Lottery { tickets: t, .. } => {
            *t = tickets;
            Ok(())
        }
        _ => Err(SchedError::InvalidArgument),
    }
}

/// Set a priority process's band (§4.7, §6). Rejects out-of-range priorities.
pub fn setpriority(table: &ProcessTable, cpu_id: usize, pid: i32, priority: u8) -> Result<()> {
    if !(crate::param::MIN_PRIORITY..=crate::param::MAX_PRIORITY).contains(&priority) {
        return Err(SchedError::InvalidArgument);
    }
    let mut slots = table.lock(cpu_id);
    let idx = slots.iter().position(|p| p.pid == pid && p.state != ProcessState::Unused);
    let Some(idx) = idx else {
        return Err(SchedError::InvalidArgument);
    };
    match &mut slots[idx].meta {
        crate::process::SchedMeta::Priority { priority: p, wait_ticks } => {
            *p = priority;
            *wait_ticks = 0;
            Ok(())
        }
        _ => Err(SchedError::InvalidArgument),
    }
}
