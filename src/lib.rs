//! A multi-CPU process scheduler core for a teaching kernel: three pluggable policies
//! (lottery, priority with aging, round-robin) over a fixed-size process table, grounded in
//! `dzvon-xv6-riscv-rs`'s `proc.rs`/`spinlock.rs` and `garentyler-xv6-riscv`'s process
//! lifecycle. See `SPEC_FULL.md` and `DESIGN.md` for the full shape and the reasoning behind
//! every deviation from the teacher.
//!
//! Unlike the teacher, this crate does not touch hardware: context switching, the trap path,
//! and virtual memory are assumed external (their real implementations live in the kernel
//! that embeds this crate). The only facts this crate needs from its environment are a
//! monotonic tick counter and a CPU-identifier primitive, both supplied by the caller as plain
//! parameters.

pub mod config;
pub mod cpu;
pub mod error;
pub mod param;
pub mod policy;
pub mod preempt;
pub mod prng;
pub mod process;
pub mod runqueue;
pub mod scheduler;
pub mod sleepwake;
pub mod spinlock;
pub mod stats;
pub mod syscall;

use config::SchedulerConfig;
use cpu::Cpus;
use param::NCPU;
use policy::Policy;
use process::ProcessTable;
use runqueue::RunQueue;
use spinlock::SpinMutex;
use std::sync::atomic::{AtomicU64, AtomicUsize};

pub use error::{SchedError, Result};
pub use syscall::WaitOutcome;

/// The scheduler core: a process table, one run queue and one PRNG per CPU, and the
/// configuration governing all of them. Construct one per booted kernel instance.
pub struct Kernel {
    pub table: ProcessTable,
    runqueues: Vec<SpinMutex<RunQueue>>,
    cpus: SpinMutex<Cpus>,
    prngs: Vec<SpinMutex<prng::Prng>>,
    config: SchedulerConfig,
    ticks: AtomicU64,
    context_switches: AtomicU64,
    init_slot: AtomicUsize,
}

impl Kernel {
    /// Construct a kernel from a full [`SchedulerConfig`] (policy plus tunables).
    pub fn with_config(config: SchedulerConfig) -> Kernel {
        let runqueues = (0..NCPU).map(|_| SpinMutex::new("runqueue", RunQueue::for_policy(&config.policy))).collect();
        let prngs = (0..NCPU).map(|_| SpinMutex::new("prng", prng::Prng::new())).collect();
        log::info!("kernel initialized with {} scheduling policy", config.policy.name());
        Kernel {
            table: ProcessTable::new(),
            runqueues,
            cpus: SpinMutex::new("cpus", Cpus::new()),
            prngs,
            config,
            ticks: AtomicU64::new(0),
            context_switches: AtomicU64::new(0),
            init_slot: AtomicUsize::new(usize::MAX),
        }
    }

    /// Construct a kernel with the default tunables for `policy` (a convenience wrapper around
    /// [`Kernel::with_config`]).
    pub fn new(policy: Policy) -> Kernel {
        Kernel::with_config(SchedulerConfig::new(policy))
    }

    pub fn policy(&self) -> &Policy {
        &self.config.policy
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Load-balance target for a newly spawned or forked process (§4.3): the CPU with the
    /// fewest runnable-or-running processes, ties broken by lowest index.
    pub fn least_loaded_cpu(&self, cpu_id: usize) -> usize {
        let cpus = self.cpus.lock(cpu_id);
        let mut best = 0usize;
        let mut best_load = usize::MAX;
        for i in 0..cpus.len() {
            let queue_len = self.runqueues[i].lock(cpu_id).len();
            let running = if cpus.get(i).current.is_some() { 1 } else { 0 };
            let load = queue_len + running;
            if load < best_load {
                best_load = load;
                best = i;
            }
        }
        best
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn context_switches(&self) -> u64 {
        self.context_switches.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Run one iteration of the scheduler loop on `cpu_id` (§4.4). `switch` stands in for the
    /// real context-switch primitive.
    pub fn schedule(&self, cpu_id: usize, switch: &mut dyn scheduler::ContextSwitch) -> Option<usize> {
        let ticks_now = self.ticks();
        let mut prng_guard = self.prngs[cpu_id].lock(cpu_id);
        scheduler::schedule_once(
            &self.table,
            &self.runqueues,
            &self.cpus,
            &self.context_switches,
            cpu_id,
            ticks_now,
            &mut prng_guard,
            switch,
        )
    }

    /// Advance the clock by one tick on `cpu_id` (§4.5): charges the running process, ages
    /// waiters, decays lottery tickets, and preempts if the policy says to.
    pub fn tick(&self, cpu_id: usize) -> u64 {
        let ticks_now = self.ticks.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
        preempt::tick(&self.table, &self.runqueues, &self.cpus, &self.config, cpu_id, ticks_now);
        ticks_now
    }

    pub fn runqueue_len(&self, cpu_id: usize) -> usize {
        self.runqueues[cpu_id].lock(cpu_id).len()
    }

    pub fn current(&self, cpu_id: usize) -> Option<usize> {
        self.cpus.lock(cpu_id).get(cpu_id).current
    }

    pub fn getpinfo(&self, cpu_id: usize) -> Vec<stats::ProcInfo> {
        stats::getpinfo(&self.table, cpu_id)
    }

    pub fn getpinfo_one(&self, cpu_id: usize, pid: i32) -> Option<stats::ProcInfo> {
        stats::getpinfo_one(&self.table, cpu_id, pid)
    }

    pub fn settickets(&self, cpu_id: usize, pid: i32, tickets: u32) -> Result<()> {
        stats::settickets(&self.table, cpu_id, pid, tickets)
    }

    /// Change a priority process's band. If it is currently sitting in its run queue (rather
    /// than Running or blocked), it is re-filed into the band matching the new priority --
    /// otherwise a process set to priority 0 while still parked in the band-5 lane would never
    /// actually be scanned before lower-priority processes.
    pub fn setpriority(&self, cpu_id: usize, pid: i32, priority: u8) -> Result<()> {
        if !(param::MIN_PRIORITY..=param::MAX_PRIORITY).contains(&priority) {
            return Err(SchedError::InvalidArgument);
        }
        let mut slots = self.table.lock(cpu_id);
        let idx = slots
            .iter()
            .position(|p| p.pid == pid && p.state != process::ProcessState::Unused)
            .ok_or(SchedError::InvalidArgument)?;
        match &mut slots[idx].meta {
            process::SchedMeta::Priority { priority: p, wait_ticks } => {
                *p = priority;
                *wait_ticks = 0;
            }
            _ => return Err(SchedError::InvalidArgument),
        }
        let mut rq = self.runqueues[cpu_id].lock(cpu_id);
        if rq.contains(idx) {
            rq.remove(idx);
            rq.add(idx, &slots[..]);
        }
        Ok(())
    }

    pub fn wakeup(&self, cpu_id: usize, chan: u64) -> Vec<usize> {
        sleepwake::wakeup(&self.table, &self.runqueues, cpu_id, chan)
    }
}
