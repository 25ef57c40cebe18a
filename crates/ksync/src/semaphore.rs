// =============================================================================
// MinimalOS NextGen — Counting Semaphore
// =============================================================================
//
// A semaphore is a nonnegative counter with two atomic operations:
//
//   - down ("P"): wait for the value to become positive, then decrement it
//   - up   ("V"): increment the value and wake one waiting thread, if any
//
// It is the building block for everything else in this crate: a Lock is a
// semaphore of value 1 with an owner, and a condition variable parks each
// waiter on a private semaphore of value 0.
//
// WAKE ORDER:
//   Waiters are queued by descending priority (arrival order among equals).
//   A waiter's priority can change while it sleeps (it may hold a lock that
//   somebody donates to), so `up` re-sorts the queue before picking. The
//   thread woken is always the one with the highest priority AT WAKE TIME.
//
// INTERRUPT CONTEXT:
//   `try_down` and `up` never sleep and may be called from an interrupt
//   handler. `down` may sleep and must not.
// =============================================================================

use alloc::vec::Vec;

use crate::intr::{self, IntrGuard, IrqCell};
use crate::ordering::by_priority_desc;
use crate::platform;
use crate::thread::Thread;
use crate::wait_queue::WaitQueue;

/// A counting semaphore whose `down` sleeps instead of spinning.
///
/// Safe to share between threads and to `up` from an interrupt handler.
///
/// # Examples
/// ```ignore
/// static DISK_DONE: Semaphore = Semaphore::new(0);
///
/// // Driver thread:
/// start_transfer();
/// DISK_DONE.down(); // sleeps until the completion interrupt
///
/// // Completion interrupt handler:
/// DISK_DONE.up();
/// ```
pub struct Semaphore {
    value: IrqCell<u32>,
    waiters: IrqCell<WaitQueue<&'static Thread>>,
}

impl Semaphore {
    /// Creates a semaphore with the given initial value and no waiters.
    pub const fn new(value: u32) -> Self {
        Self {
            value: IrqCell::new(value),
            waiters: IrqCell::new(WaitQueue::new()),
        }
    }

    /// Down or "P": sleeps until the value is positive, then decrements it.
    ///
    /// # Panics
    /// If called from an interrupt handler.
    pub fn down(&self) {
        let platform = platform::get();
        assert!(
            !platform.in_interrupt_context(),
            "sema_down from interrupt context"
        );

        let guard = intr::disable();
        while self.value.get(&guard) == 0 {
            self.sleep(&guard);
        }
        self.value.with_mut(&guard, |value| *value -= 1);
    }

    /// Queues the running thread and blocks it until an `up` wakes it.
    ///
    /// Does not touch the value: a woken thread must re-check it, since a
    /// thread that was already ready may have taken the unit first.
    pub(crate) fn sleep(&self, guard: &IntrGuard) {
        let platform = platform::get();
        let current = platform.current_thread();
        self.waiters.with_mut(guard, |waiters| {
            waiters.insert_ordered(current, by_priority_desc);
        });
        platform.block(guard);
    }

    /// Decrements the value only if it is positive. Never sleeps.
    ///
    /// Returns `true` if the semaphore was decremented.
    pub fn try_down(&self) -> bool {
        let guard = intr::disable();
        self.value.with_mut(&guard, |value| {
            if *value > 0 {
                *value -= 1;
                true
            } else {
                false
            }
        })
    }

    /// Up or "V": increments the value and wakes the highest-priority
    /// waiter, then lets the scheduler preempt us if that waiter outranks
    /// the running thread.
    pub fn up(&self) {
        let platform = platform::get();
        {
            let guard = intr::disable();
            let woken = self.waiters.with_mut(&guard, |waiters| {
                if waiters.is_empty() {
                    return None;
                }
                waiters.sort(by_priority_desc);
                waiters.pop_front()
            });
            if let Some(thread) = woken {
                log::trace!(
                    "sema: wake {} ({}) at priority {}",
                    thread.name(),
                    thread.tid(),
                    thread.priority()
                );
                platform.unblock(thread, &guard);
            }
            self.value.with_mut(&guard, |value| {
                assert!(*value < u32::MAX, "semaphore value overflow");
                *value += 1;
            });
        }
        platform.check_preemption();
    }

    /// Current value. Stale as soon as it is returned unless the caller is
    /// itself inside a critical section.
    pub fn value(&self) -> u32 {
        let guard = intr::disable();
        self.value.get(&guard)
    }

    /// Snapshot of the threads blocked in `down`, in queue order.
    pub fn waiters(&self) -> Vec<&'static Thread> {
        let guard = intr::disable();
        self.waiters
            .with(&guard, |waiters| waiters.iter().copied().collect())
    }

    /// Number of threads blocked in `down`.
    pub fn waiter_count(&self) -> usize {
        let guard = intr::disable();
        self.waiters.with(&guard, |waiters| waiters.len())
    }

    /// Runs `f` over the waiter queue inside the caller's critical section.
    pub(crate) fn with_waiters<R>(
        &self,
        guard: &IntrGuard,
        f: impl FnOnce(&WaitQueue<&'static Thread>) -> R,
    ) -> R {
        self.waiters.with(guard, f)
    }
}

impl Default for Semaphore {
    fn default() -> Self {
        Self::new(0)
    }
}
