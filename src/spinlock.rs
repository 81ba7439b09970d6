//! Mutual-exclusion spinlocks, grounded in the teacher's `spinlock.rs`.
//!
//! The teacher identifies a lock's holder by a raw `*mut Cpu` obtained from a `tp`-register
//! read. Per §5's redesign note, this crate's core only assumes a CPU-identifier primitive is
//! available, not a real register — so the holder is tracked as a plain `usize` CPU index that
//! every caller passes in explicitly, rather than read out of hardware. The locking discipline
//! (CAS loop, panic on self-relock, panic on drop-by-non-holder) is otherwise unchanged.

use crate::error;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicUsize, Ordering};

/// Sentinel meaning "no CPU holds this lock".
pub const NO_CPU: usize = usize::MAX;

pub struct SpinMutex<T: ?Sized> {
    holder: AtomicUsize,
    name: &'static str,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send> Sync for SpinMutex<T> {}
unsafe impl<T: ?Sized + Send> Send for SpinMutex<T> {}

pub struct SpinMutexGuard<'a, T: ?Sized> {
    lock: &'a SpinMutex<T>,
    cpu_id: usize,
}

impl<T> SpinMutex<T> {
    pub const fn new(name: &'static str, value: T) -> SpinMutex<T> {
        SpinMutex {
            holder: AtomicUsize::new(NO_CPU),
            name,
            data: UnsafeCell::new(value),
        }
    }
}

impl<T: ?Sized> SpinMutex<T> {
    /// Acquire the lock on behalf of `cpu_id`. Spins until acquired.
    pub fn lock(&self, cpu_id: usize) -> SpinMutexGuard<'_, T> {
        if self.holding(cpu_id) {
            error::fatal("lock-reentrancy", &format!("{} already held by cpu {cpu_id}", self.name));
        }
        while self
            .holder
            .compare_exchange(NO_CPU, cpu_id, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
        SpinMutexGuard { lock: self, cpu_id }
    }

    /// True iff `cpu_id` currently holds this lock.
    pub fn holding(&self, cpu_id: usize) -> bool {
        self.holder.load(Ordering::Relaxed) == cpu_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T: ?Sized> Deref for SpinMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T: ?Sized> DerefMut for SpinMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T: ?Sized> Drop for SpinMutexGuard<'_, T> {
    fn drop(&mut self) {
        if !self.lock.holding(self.cpu_id) {
            error::fatal("lock-discipline", &format!("{} dropped by non-holder", self.lock.name));
        }
        self.lock.holder.store(NO_CPU, Ordering::Release);
    }
}

/// Expose the lock a guard was taken from, for the rare "release lock A, then take lock B"
/// dance `sleep` needs (§4.6) when the caller's lock isn't the process-table lock.
pub fn guard_lock<'a, T: ?Sized>(guard: &SpinMutexGuard<'a, T>) -> &'a SpinMutex<T> {
    guard.lock
}
