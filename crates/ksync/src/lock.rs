// =============================================================================
// MinimalOS NextGen — Lock (with priority donation)
// =============================================================================
//
// A lock is a semaphore with an initial value of 1 plus an OWNER:
//   - a semaphore may be upped by a thread that never downed it
//   - a lock must be released by the same thread that acquired it
// Locks are not recursive: acquiring a lock you already hold is a bug.
//
// PRIORITY DONATION:
//   If a high-priority thread H blocks on a lock held by a low-priority
//   thread L, any medium-priority thread M would keep L (and therefore H)
//   off the CPU indefinitely. To prevent that, H lends L its priority for as
//   long as L holds the lock (see donation.rs). Releasing the lock takes the
//   loan back.
//
// States: unlocked, or locked-by T.
//
//   acquire:  until try_down wins: record wait_on_lock, donate, sleep
//             → holder = me
//   release:  holder = none → drop donations for THIS lock → refresh → up
// =============================================================================

use alloc::vec::Vec;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::donation;
use crate::intr::{self, IntrGuard};
use crate::platform;
use crate::semaphore::Semaphore;
use crate::thread::Thread;

/// A sleeping, non-recursive lock with an owner and priority donation.
///
/// Unlike [`Mutex`](crate::Mutex) it does not own the data it protects;
/// pair it with a [`Condvar`](crate::Condvar) or guard external state.
///
/// # Examples
/// ```ignore
/// static TABLE_LOCK: Lock = Lock::new();
///
/// TABLE_LOCK.acquire(); // a waiter lends us its priority while we hold it
/// update_table();
/// TABLE_LOCK.release();
/// ```
pub struct Lock {
    /// Thread holding the lock, or null. Never owns the thread.
    holder: AtomicPtr<Thread>,
    /// Binary semaphore doing the actual waiting.
    semaphore: Semaphore,
}

impl Lock {
    /// Creates an unlocked lock.
    pub const fn new() -> Self {
        Self {
            holder: AtomicPtr::new(ptr::null_mut()),
            semaphore: Semaphore::new(1),
        }
    }

    /// Acquires the lock, sleeping until it is available.
    ///
    /// If the lock is held, the caller donates its priority to the holder
    /// (and transitively down the chain of holders) before going to sleep.
    ///
    /// # Panics
    /// From an interrupt handler, or if the caller already holds the lock.
    pub fn acquire(&self) {
        let platform = platform::get();
        assert!(
            !platform.in_interrupt_context(),
            "lock_acquire from interrupt context"
        );
        assert!(
            !self.held_by_current(),
            "lock already held by the current thread"
        );

        let current = platform.current_thread();
        let guard = intr::disable();
        // Every failed attempt donates to whoever holds the lock NOW. A
        // woken waiter can lose the lock to a thread that was already ready,
        // and that new holder never saw it in the waiter queue.
        while !self.semaphore.try_down() {
            current.set_wait_on_lock(Some(self), &guard);
            donation::donate_priority(current, &guard);
            self.semaphore.sleep(&guard);
        }
        current.set_wait_on_lock(None, &guard);
        self.take_ownership(current, &guard);
    }

    /// Acquires the lock only if it is free right now. Never sleeps.
    ///
    /// # Panics
    /// If the caller already holds the lock.
    pub fn try_acquire(&self) -> bool {
        assert!(
            !self.held_by_current(),
            "lock already held by the current thread"
        );

        let guard = intr::disable();
        let acquired = self.semaphore.try_down();
        if acquired {
            self.take_ownership(platform::get().current_thread(), &guard);
        }
        acquired
    }

    /// Releases the lock, gives back every donation that was made because
    /// of it, and wakes the highest-priority waiter.
    ///
    /// # Panics
    /// If the caller does not hold the lock.
    pub fn release(&self) {
        assert!(
            self.held_by_current(),
            "lock not held by the current thread"
        );

        let platform = platform::get();
        let holder = platform.current_thread();
        let guard = intr::disable();
        self.set_holder(None, &guard);
        donation::revoke(holder, self, &guard);
        platform.refresh_priority(holder, &guard);
        self.semaphore.up();
    }

    /// Whether the running thread holds this lock.
    ///
    /// Asking whether some OTHER thread holds a lock is inherently racy;
    /// only the answer about oneself is stable.
    pub fn held_by_current(&self) -> bool {
        self.holder()
            .is_some_and(|holder| ptr::eq(holder, platform::get().current_thread()))
    }

    /// The thread holding the lock, if any. Racy, see `held_by_current`.
    pub fn holder(&self) -> Option<&'static Thread> {
        // SAFETY: only `&'static Thread` values are ever stored.
        unsafe { self.holder.load(Ordering::Relaxed).as_ref() }
    }

    /// Snapshot of the threads sleeping in `acquire`, in queue order.
    pub fn waiters(&self) -> Vec<&'static Thread> {
        self.semaphore.waiters()
    }

    pub(crate) fn semaphore(&self) -> &Semaphore {
        &self.semaphore
    }

    fn take_ownership(&self, thread: &'static Thread, guard: &IntrGuard) {
        self.set_holder(Some(thread), guard);
        donation::inherit_waiters(self, thread, guard);
    }

    fn set_holder(&self, thread: Option<&'static Thread>, _guard: &IntrGuard) {
        let raw = thread.map_or(ptr::null_mut(), |t| ptr::from_ref(t).cast_mut());
        self.holder.store(raw, Ordering::Relaxed);
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}
