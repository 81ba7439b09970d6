//! Per-CPU state, grounded in the teacher's `Cpu`/`CPUS`.
//!
//! The teacher reads `tp` to learn "which CPU am I" and toggles real `sstatus` bits to mask
//! interrupts. Per §5, this crate's core only assumes a CPU-identifier primitive and a
//! monotonic tick counter from its environment, so `cpuid` is just the index the caller
//! already knows (it is driving that CPU's scheduler loop), and "interrupts enabled" is a
//! plain per-CPU flag instead of a `sstatus` read/write. A bare-metal embedding wires the two
//! real primitives in at exactly the call sites `push_off`/`pop_off` use.

use crate::error;
use crate::param::NCPU;

/// Per-CPU scheduling state.
#[derive(Debug, Clone)]
pub struct Cpu {
    /// Slot index of the process currently Running on this CPU, if any (I7).
    pub current: Option<usize>,
    /// Depth of `push_off` nesting.
    ncli: u32,
    /// Whether interrupts were enabled before the outermost `push_off`.
    previous_interrupts_enabled: bool,
    /// This CPU's current interrupt-enabled flag (the thing `push_off`/`pop_off` mask).
    interrupts_enabled: bool,
    /// Scheduler-iteration counter, used as the lottery PRNG's salt and the lottery decay
    /// pass's cadence (§4.1, §4.4).
    pub iteration: u64,
}

impl Cpu {
    pub const fn new() -> Cpu {
        Cpu {
            current: None,
            ncli: 0,
            previous_interrupts_enabled: false,
            interrupts_enabled: true,
            iteration: 0,
        }
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    /// Disable interrupts on this CPU, matching `push_off`: nestable, and remembers the
    /// pre-nesting state so `pop_off` can restore it exactly.
    pub fn push_off(&mut self) {
        let was_enabled = self.interrupts_enabled;
        self.interrupts_enabled = false;
        if self.ncli == 0 {
            self.previous_interrupts_enabled = was_enabled;
        }
        self.ncli += 1;
    }

    /// Reverse one `push_off`. Restores interrupts only once nesting returns to zero.
    pub fn pop_off(&mut self) {
        if self.interrupts_enabled {
            error::fatal("pop_off", "pop_off() called with interrupts enabled");
        }
        if self.ncli == 0 {
            error::fatal("pop_off", "pop_off() called too many times");
        }
        self.ncli -= 1;
        if self.ncli == 0 && self.previous_interrupts_enabled {
            self.interrupts_enabled = true;
        }
    }

    /// Current `push_off` nesting depth. `sched()` asserts this is exactly 1 (§4.5, §5).
    pub fn nesting(&self) -> u32 {
        self.ncli
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Cpu::new()
    }
}

/// The fixed-size table of per-CPU state, owned by [`crate::Kernel`].
#[derive(Debug, Clone)]
pub struct Cpus {
    cpus: [Cpu; NCPU],
}

impl Cpus {
    pub fn new() -> Cpus {
        Cpus {
            cpus: core::array::from_fn(|_| Cpu::new()),
        }
    }

    pub fn get(&self, cpu_id: usize) -> &Cpu {
        &self.cpus[cpu_id]
    }

    pub fn get_mut(&mut self, cpu_id: usize) -> &mut Cpu {
        &mut self.cpus[cpu_id]
    }

    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cpu> {
        self.cpus.iter()
    }
}

impl Default for Cpus {
    fn default() -> Self {
        Cpus::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_matched_restores_state() {
        let mut c = Cpu::new();
        assert!(c.interrupts_enabled());
        c.push_off();
        assert!(!c.interrupts_enabled());
        c.push_off();
        assert_eq!(c.nesting(), 2);
        c.pop_off();
        assert!(!c.interrupts_enabled());
        c.pop_off();
        assert!(c.interrupts_enabled());
    }

    #[test]
    #[should_panic(expected = "too many times")]
    fn unmatched_pop_panics() {
        let mut c = Cpu::new();
        c.push_off();
        c.pop_off();
        c.pop_off();
    }
}
