//! Per-CPU run queues (§4.2), grounded in `garentyler-xv6-riscv`'s `Queue<T>` ring buffer and
//! in `original_source/priority-scheduler/runqueue.c`'s per-priority intrusive FIFOs.
//!
//! Each policy gets its own representation rather than one unified container (§9 Design
//! Notes), unified behind [`RunQueueOps`] so the scheduler loop (§4.4) doesn't need to know
//! which policy is active.

use crate::param::{
    HIGH_PRIORITY_CUTOFF, MAX_PRIORITY, MIN_PRIORITY, NPROC, SHORT_LIVED_PRIORITY,
    TIME_SLICE_HIGH_PRIORITY, TIME_SLICE_LOW_PRIORITY,
};
use crate::prng::Prng;
use crate::process::ProcessSlot;
use std::collections::VecDeque;

/// Inputs a `select` call needs beyond the slots themselves.
pub struct SelectCtx<'a> {
    pub prng: &'a mut Prng,
    pub ticks_now: u64,
    pub cpu_id: usize,
    pub salt: u64,
}

/// Common shape every run-queue representation implements (§4.2's three trait-shaped hooks:
/// placement on enqueue, membership removal, and selection).
pub trait RunQueueOps {
    /// Place `idx` into the queue. Reads `slots[idx]`'s scheduling metadata to decide which
    /// band/lane it belongs in -- this is the "on_enqueue" hook.
    fn add(&mut self, idx: usize, slots: &[ProcessSlot]);
    fn remove(&mut self, idx: usize);
    fn contains(&self, idx: usize) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Pick the next process to run and remove it from the queue. Returns `None` if empty.
    fn select(&mut self, slots: &mut [ProcessSlot], ctx: &mut SelectCtx) -> Option<usize>;
}

/// Lottery run queue: a flat membership list: §4.1's weighted draw walks it summing tickets.
#[derive(Default)]
pub struct LotteryQueue {
    members: Vec<usize>,
}

impl LotteryQueue {
    pub fn new() -> LotteryQueue {
        LotteryQueue { members: Vec::new() }
    }

    /// Apply the periodic decay pass (§4.4: `recent_schedules = recent_schedules * 3/4` every
    /// `decay_period` iterations) to every current member. `tickets` itself is never touched
    /// here (§4.2: any ticket adjustment leaves `tickets` unchanged). Called by the tick
    /// handler, not by `select`.
    pub fn decay_recent_schedules(&self, slots: &mut [ProcessSlot], numerator: u32, denominator: u32) {
        for &idx in &self.members {
            slots[idx].recent_schedules = (slots[idx].recent_schedules * numerator) / denominator;
        }
    }

    /// Accrue a per-tick starvation boost on every waiting member, capped at `cap` (§9: the
    /// lottery policy's analogue of priority aging). Reset to `0` when a process is selected
    /// (`scheduler::schedule_once`).
    pub fn accrue_starvation_boost(&self, slots: &mut [ProcessSlot], increment: u32, cap: u32) {
        for &idx in &self.members {
            if let crate::process::SchedMeta::Lottery { boost, .. } = &mut slots[idx].meta {
                *boost = (*boost + increment).min(cap);
            }
        }
    }
}

impl RunQueueOps for LotteryQueue {
    fn add(&mut self, idx: usize, _slots: &[ProcessSlot]) {
        if !self.members.contains(&idx) {
            self.members.push(idx);
        }
    }

    fn remove(&mut self, idx: usize) {
        self.members.retain(|&m| m != idx);
    }

    fn contains(&self, idx: usize) -> bool {
        self.members.contains(&idx)
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn select(&mut self, slots: &mut [ProcessSlot], ctx: &mut SelectCtx) -> Option<usize> {
        if self.members.is_empty() {
            return None;
        }
        // Fisher-Yates shuffle of the member set (§4.2 step 2) before the weighted draw.
        for i in (1..self.members.len()).rev() {
            let j = ctx.prng.range((i + 1) as u32) as usize;
            self.members.swap(i, j);
        }
        // §4.2 step 1: sum tickets + boost across all members.
        let total: u32 = self
            .members
            .iter()
            .map(|&idx| slots[idx].meta.effective_tickets().unwrap_or(1))
            .sum();
        if total == 0 {
            return None;
        }
        let winning = ctx.prng.reseed_and_draw(ctx.ticks_now, ctx.cpu_id, ctx.salt, total);
        let mut acc = 0u32;
        let mut chosen = self.members[0];
        for &idx in &self.members {
            acc += slots[idx].meta.effective_tickets().unwrap_or(1);
            if winning < acc {
                chosen = idx;
                break;
            }
        }
        self.remove(chosen);
        Some(chosen)
    }
}

/// Priority run queue: an extra short-lived lane scanned before 11 numbered FIFO bands
/// (`0` = highest priority), matching the C source's `short_lived_head`/`priority_head` arrays.
pub struct PriorityQueue {
    short_lived: VecDeque<usize>,
    bands: Vec<VecDeque<usize>>,
}

impl PriorityQueue {
    pub fn new() -> PriorityQueue {
        PriorityQueue {
            short_lived: VecDeque::new(),
            bands: (MIN_PRIORITY..=MAX_PRIORITY).map(|_| VecDeque::new()).collect(),
        }
    }

    fn band_index(priority: u8) -> usize {
        (priority.clamp(MIN_PRIORITY, MAX_PRIORITY) - MIN_PRIORITY) as usize
    }

    /// Aging pass (§4.2): every member not selected this tick has `wait_ticks` incremented by
    /// the caller beforehand; here we promote anyone who crossed `aging_threshold`.
    pub fn age(&mut self, slots: &mut [ProcessSlot], aging_threshold: u32) {
        for band in MIN_PRIORITY + 1..=MAX_PRIORITY {
            let idx_in_band = Self::band_index(band);
            let mut promote = Vec::new();
            for &idx in &self.bands[idx_in_band] {
                if let crate::process::SchedMeta::Priority { wait_ticks, .. } = &slots[idx].meta {
                    if *wait_ticks >= aging_threshold {
                        promote.push(idx);
                    }
                }
            }
            for idx in promote {
                self.bands[idx_in_band].retain(|&m| m != idx);
                if let crate::process::SchedMeta::Priority { priority, wait_ticks } = &mut slots[idx].meta {
                    *priority = priority.saturating_sub(1).max(MIN_PRIORITY);
                    *wait_ticks = 0;
                }
                let new_band = slots[idx].meta.priority().unwrap_or(MAX_PRIORITY);
                self.bands[Self::band_index(new_band)].push_back(idx);
            }
        }
    }

    /// Every member currently queued (not the one about to be selected/running), for the tick
    /// handler to age.
    pub fn waiting_members(&self) -> impl Iterator<Item = usize> + '_ {
        self.short_lived.iter().copied().chain(self.bands.iter().flatten().copied())
    }

    /// Time slice for a priority, per §4.2's two-tier slice table.
    pub fn time_slice_for(priority: u8) -> u32 {
        if priority <= HIGH_PRIORITY_CUTOFF {
            TIME_SLICE_HIGH_PRIORITY
        } else {
            TIME_SLICE_LOW_PRIORITY
        }
    }

    /// True if some `Runnable` process is waiting in a strictly higher-priority band (a lower
    /// numeric value) than `priority` (§4.5's immediate-preemption rule). The short-lived lane
    /// counts as band `SHORT_LIVED_PRIORITY`.
    pub fn has_strictly_higher_priority_waiting(&self, priority: u8) -> bool {
        if SHORT_LIVED_PRIORITY < priority && !self.short_lived.is_empty() {
            return true;
        }
        (MIN_PRIORITY..priority).any(|band| !self.bands[Self::band_index(band)].is_empty())
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        PriorityQueue::new()
    }
}

impl RunQueueOps for PriorityQueue {
    fn add(&mut self, idx: usize, slots: &[ProcessSlot]) {
        let priority = slots[idx].meta.priority().unwrap_or(SHORT_LIVED_PRIORITY);
        if priority == SHORT_LIVED_PRIORITY && !slots[idx].has_run {
            self.short_lived.push_back(idx);
        } else {
            self.bands[Self::band_index(priority)].push_back(idx);
        }
    }

    fn remove(&mut self, idx: usize) {
        self.short_lived.retain(|&m| m != idx);
        for band in &mut self.bands {
            band.retain(|&m| m != idx);
        }
    }

    fn contains(&self, idx: usize) -> bool {
        self.short_lived.contains(&idx) || self.bands.iter().any(|b| b.contains(&idx))
    }

    fn len(&self) -> usize {
        self.short_lived.len() + self.bands.iter().map(|b| b.len()).sum::<usize>()
    }

    fn select(&mut self, _slots: &mut [ProcessSlot], _ctx: &mut SelectCtx) -> Option<usize> {
        if let Some(idx) = self.short_lived.pop_front() {
            return Some(idx);
        }
        for band in &mut self.bands {
            if let Some(idx) = band.pop_front() {
                return Some(idx);
            }
        }
        None
    }
}

/// Round-robin run queue: a single FIFO band (§4.2).
#[derive(Default)]
pub struct RoundRobinQueue {
    ready: VecDeque<usize>,
}

impl RoundRobinQueue {
    pub fn new() -> RoundRobinQueue {
        RoundRobinQueue { ready: VecDeque::new() }
    }
}

impl RunQueueOps for RoundRobinQueue {
    fn add(&mut self, idx: usize, _slots: &[ProcessSlot]) {
        if !self.ready.contains(&idx) {
            self.ready.push_back(idx);
        }
    }

    fn remove(&mut self, idx: usize) {
        self.ready.retain(|&m| m != idx);
    }

    fn contains(&self, idx: usize) -> bool {
        self.ready.contains(&idx)
    }

    fn len(&self) -> usize {
        self.ready.len()
    }

    fn select(&mut self, _slots: &mut [ProcessSlot], _ctx: &mut SelectCtx) -> Option<usize> {
        self.ready.pop_front()
    }
}

/// A per-CPU run queue, tagged by which policy built it.
pub enum RunQueue {
    Lottery(LotteryQueue),
    Priority(PriorityQueue),
    RoundRobin(RoundRobinQueue),
}

impl RunQueue {
    pub fn for_policy(policy: &crate::policy::Policy) -> RunQueue {
        match policy {
            crate::policy::Policy::Lottery { .. } => RunQueue::Lottery(LotteryQueue::new()),
            crate::policy::Policy::Priority { .. } => RunQueue::Priority(PriorityQueue::new()),
            crate::policy::Policy::RoundRobin => RunQueue::RoundRobin(RoundRobinQueue::new()),
        }
    }

    pub fn add(&mut self, idx: usize, slots: &[ProcessSlot]) {
        match self {
            RunQueue::Lottery(q) => q.add(idx, slots),
            RunQueue::Priority(q) => q.add(idx, slots),
            RunQueue::RoundRobin(q) => q.add(idx, slots),
        }
    }

    pub fn remove(&mut self, idx: usize) {
        match self {
            RunQueue::Lottery(q) => q.remove(idx),
            RunQueue::Priority(q) => q.remove(idx),
            RunQueue::RoundRobin(q) => q.remove(idx),
        }
    }

    pub fn contains(&self, idx: usize) -> bool {
        match self {
            RunQueue::Lottery(q) => q.contains(idx),
            RunQueue::Priority(q) => q.contains(idx),
            RunQueue::RoundRobin(q) => q.contains(idx),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RunQueue::Lottery(q) => q.len(),
            RunQueue::Priority(q) => q.len(),
            RunQueue::RoundRobin(q) => q.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn select(&mut self, slots: &mut [ProcessSlot; NPROC], ctx: &mut SelectCtx) -> Option<usize> {
        match self {
            RunQueue::Lottery(q) => q.select(slots, ctx),
            RunQueue::Priority(q) => q.select(slots, ctx),
            RunQueue::RoundRobin(q) => q.select(slots, ctx),
        }
    }

    /// Whether this process should be preempted at the current tick (§4.5's
    /// "on_tick_preempt_decision" hook): round-robin and lottery always yield at the tick
    /// boundary, priority compares elapsed ticks against its two-tier slice.
    pub fn should_preempt(&self, slot: &ProcessSlot) -> bool {
        match (self, &slot.meta) {
            (RunQueue::Priority(pq), crate::process::SchedMeta::Priority { priority, .. }) => {
                slot.quantum_ticks >= PriorityQueue::time_slice_for(*priority) as u64
                    || pq.has_strictly_higher_priority_waiting(*priority)
            }
            _ => true,
        }
    }
}
