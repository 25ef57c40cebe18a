//! Mesa-style condition variables.
//!
//! A condition variable lets one piece of code signal a condition and
//! cooperating code wait for it. It is always used together with a [`Lock`]
//! that the caller already holds; one lock may serve many condition
//! variables.
//!
//! Signalling only makes a waiter runnable. By the time it has re-acquired
//! the lock the condition may no longer hold, so waiters re-test it in a
//! loop:
//!
//! ```ignore
//! lock.acquire();
//! while queue.is_empty() {
//!     not_empty.wait(&lock);
//! }
//! ```
//!
//! Each waiter parks on a private one-shot semaphore that lives on its own
//! stack for the duration of [`Condvar::wait`]. The condition queue orders
//! those semaphores by the priority of the thread parked on each, and
//! re-sorts before every signal.

use core::ptr::NonNull;

use crate::intr::{self, IrqCell};
use crate::lock::Lock;
use crate::mutex::MutexGuard;
use crate::ordering::by_waiter_priority_desc;
use crate::platform;
use crate::semaphore::Semaphore;
use crate::thread::Thread;
use crate::wait_queue::WaitQueue;

/// One waiter: a semaphore of value 0 and the thread that will sleep on it.
struct SemaphoreElem {
    semaphore: Semaphore,
    waiter: &'static Thread,
}

/// Queue entry pointing at a `SemaphoreElem` on a waiting thread's stack.
///
/// The element outlives its queue entry: `wait` only returns after its
/// semaphore was upped, and it is upped only after the entry was popped.
#[derive(Clone, Copy)]
pub(crate) struct WaiterRef(NonNull<SemaphoreElem>);

// SAFETY: the pointee is only read (its semaphore synchronises through
// critical sections of its own), and it stays alive while queued.
unsafe impl Send for WaiterRef {}

impl WaiterRef {
    pub(crate) fn waiter(&self) -> &'static Thread {
        // SAFETY: queued elements are alive, see the type docs.
        unsafe { self.0.as_ref() }.waiter
    }

    /// # Safety
    /// The element must still be alive: either it is queued, or it was just
    /// popped and its semaphore has not been upped yet.
    unsafe fn semaphore<'a>(self) -> &'a Semaphore {
        // SAFETY: guaranteed by the caller.
        unsafe { &self.0.as_ref().semaphore }
    }
}

/// A Mesa-style condition variable, always used with a [`Lock`].
///
/// # Examples
/// ```ignore
/// static LOCK: Lock = Lock::new();
/// static NOT_EMPTY: Condvar = Condvar::new();
///
/// LOCK.acquire();
/// while queue_is_empty() {
///     NOT_EMPTY.wait(&LOCK);
/// }
/// let item = pop();
/// LOCK.release();
/// ```
pub struct Condvar {
    waiters: IrqCell<WaitQueue<WaiterRef>>,
}

impl Condvar {
    /// Creates a condition variable with no waiters.
    pub const fn new() -> Self {
        Self {
            waiters: IrqCell::new(WaitQueue::new()),
        }
    }

    /// Atomically releases `lock` and sleeps until signalled, then
    /// re-acquires `lock` before returning.
    ///
    /// # Panics
    /// From an interrupt handler, or if the caller does not hold `lock`.
    pub fn wait(&self, lock: &Lock) {
        let platform = platform::get();
        assert!(
            !platform.in_interrupt_context(),
            "cond_wait from interrupt context"
        );
        assert!(lock.held_by_current(), "cond_wait without holding the lock");

        let elem = SemaphoreElem {
            semaphore: Semaphore::new(0),
            waiter: platform.current_thread(),
        };
        {
            let guard = intr::disable();
            self.waiters.with_mut(&guard, |waiters| {
                waiters.insert_ordered(WaiterRef(NonNull::from(&elem)), by_waiter_priority_desc);
            });
        }
        lock.release();
        elem.semaphore.down();
        lock.acquire();
    }

    /// [`Condvar::wait`] for a [`Mutex`](crate::Mutex) guard. The guard is
    /// handed back once the mutex is held again.
    pub fn wait_guard<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        self.wait(guard.raw_lock());
        guard
    }

    /// Wakes the highest-priority waiter, if there is one.
    ///
    /// # Panics
    /// From an interrupt handler, or if the caller does not hold `lock`.
    pub fn signal(&self, lock: &Lock) {
        assert!(
            !intr::in_interrupt_context(),
            "cond_signal from interrupt context"
        );
        assert!(lock.held_by_current(), "cond_signal without holding the lock");

        let next = {
            let guard = intr::disable();
            self.waiters.with_mut(&guard, |waiters| {
                if waiters.is_empty() {
                    return None;
                }
                waiters.sort(by_waiter_priority_desc);
                waiters.pop_front()
            })
        };
        if let Some(waiter) = next {
            // SAFETY: just popped and not yet upped; its thread is still
            // asleep in `wait`.
            unsafe { waiter.semaphore() }.up();
        }
    }

    /// Wakes every waiter, highest priority first.
    ///
    /// # Panics
    /// Same as [`Condvar::signal`].
    pub fn broadcast(&self, lock: &Lock) {
        assert!(
            !intr::in_interrupt_context(),
            "cond_broadcast from interrupt context"
        );
        assert!(
            lock.held_by_current(),
            "cond_broadcast without holding the lock"
        );
        while self.waiter_count() > 0 {
            self.signal(lock);
        }
    }

    /// Number of threads waiting to be signalled.
    pub fn waiter_count(&self) -> usize {
        let guard = intr::disable();
        self.waiters.with(&guard, |waiters| waiters.len())
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}
