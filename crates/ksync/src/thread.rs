//! The sync-visible part of a thread record.
//!
//! The scheduler owns and allocates threads; it embeds one [`Thread`] per
//! kernel thread and hands this crate `&'static Thread` references. A thread
//! record must stay alive (and must not move) for as long as any lock,
//! semaphore or donation list can reach it, which in practice means until
//! the thread has exited holding no locks.
//!
//! Field discipline:
//!   - single-word fields are atomics, written only inside a critical
//!     section and readable racily from anywhere (`Relaxed` is enough on one
//!     core)
//!   - the donation list is an `IrqCell` and needs a guard to touch

use alloc::vec::Vec;
use core::fmt;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

use crate::config::PRI_MAX;
use crate::intr::{self, IntrGuard, IrqCell};
use crate::lock::Lock;
use crate::ordering::by_priority_desc;
use crate::wait_queue::WaitQueue;

/// Scheduling priority. Larger is more important.
pub type Priority = u8;

/// Thread identifier assigned by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Tid(u32);

impl Tid {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The part of a kernel thread the sync primitives read and write.
///
/// Embedded by the scheduler in its own thread record and handed out as
/// `&'static Thread`.
///
/// # Examples
/// ```ignore
/// static IDLE: Thread = Thread::new(Tid::from_raw(0), "idle", PRI_MIN);
///
/// let guard = intr::disable();
/// IDLE.set_base_priority(PRI_MIN, &guard);
/// ```
pub struct Thread {
    tid: Tid,
    name: &'static str,
    /// Effective priority: base priority raised by donations.
    priority: AtomicU8,
    /// Priority the thread was given by the scheduler.
    base_priority: AtomicU8,
    /// Lock this thread is blocked trying to acquire, or null.
    wait_on_lock: AtomicPtr<Lock>,
    /// Threads currently donating to this one, highest priority first.
    donations: IrqCell<WaitQueue<&'static Thread>>,
}

impl Thread {
    /// Creates a thread record with `priority` as both base and effective
    /// priority.
    ///
    /// # Panics
    /// If `priority` is above `PRI_MAX` (`PRI_MIN` is the type's floor).
    pub const fn new(tid: Tid, name: &'static str, priority: Priority) -> Self {
        assert!(priority <= PRI_MAX, "thread priority out of range");
        Self {
            tid,
            name,
            priority: AtomicU8::new(priority),
            base_priority: AtomicU8::new(priority),
            wait_on_lock: AtomicPtr::new(ptr::null_mut()),
            donations: IrqCell::new(WaitQueue::new()),
        }
    }

    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Effective priority. Racy when read about another thread.
    pub fn priority(&self) -> Priority {
        self.priority.load(Ordering::Relaxed)
    }

    pub fn base_priority(&self) -> Priority {
        self.base_priority.load(Ordering::Relaxed)
    }

    /// Changes the base priority and recomputes the effective one.
    ///
    /// Donations still in effect keep the effective priority up; the
    /// caller (the scheduler) decides whether to yield afterwards.
    pub fn set_base_priority(&self, priority: Priority, guard: &IntrGuard) {
        assert!(priority <= PRI_MAX, "thread priority out of range");
        self.base_priority.store(priority, Ordering::Relaxed);
        self.refresh_priority(guard);
    }

    /// `priority = max(base_priority, highest donor priority)`.
    ///
    /// Donors are re-sorted first: their own priorities may have moved
    /// since they were queued.
    pub fn refresh_priority(&self, guard: &IntrGuard) {
        let donated = self.donations.with_mut(guard, |donations| {
            donations.sort(by_priority_desc);
            donations.front().map(|donor| donor.priority())
        });
        let base = self.base_priority();
        let effective = donated.map_or(base, |donated| donated.max(base));
        self.priority.store(effective, Ordering::Relaxed);
    }

    /// Snapshot of the current donors, highest priority first.
    pub fn donors(&self) -> Vec<&'static Thread> {
        let guard = intr::disable();
        self.donations
            .with(&guard, |donations| donations.iter().copied().collect())
    }

    /// Whether this thread is blocked acquiring some lock.
    pub fn is_waiting_on_lock(&self) -> bool {
        !self.wait_on_lock.load(Ordering::Relaxed).is_null()
    }

    /// Whether this thread is blocked acquiring `lock`.
    pub fn is_waiting_on(&self, lock: &Lock) -> bool {
        ptr::eq(self.wait_on_lock.load(Ordering::Relaxed), lock)
    }

    // ── Crate-internal mutation (donation protocol) ───────────────

    pub(crate) fn raise_priority(&self, priority: Priority, _guard: &IntrGuard) {
        self.priority.fetch_max(priority, Ordering::Relaxed);
    }

    pub(crate) fn set_wait_on_lock(&self, lock: Option<&Lock>, _guard: &IntrGuard) {
        let raw = lock.map_or(ptr::null_mut(), |lock| ptr::from_ref(lock).cast_mut());
        self.wait_on_lock.store(raw, Ordering::Relaxed);
    }

    /// The lock this thread is blocked on.
    ///
    /// # Safety
    /// The returned lock is alive because its waiter is still blocked inside
    /// `Lock::acquire(&lock)`, which borrows it. The reference must not be
    /// kept past the critical section `_guard` belongs to.
    pub(crate) unsafe fn wait_on_lock<'g>(&self, _guard: &'g IntrGuard) -> Option<&'g Lock> {
        // SAFETY: see above; a non-null pointer was stored from a live `&Lock`.
        unsafe { self.wait_on_lock.load(Ordering::Relaxed).as_ref() }
    }

    pub(crate) fn donations(&self) -> &IrqCell<WaitQueue<&'static Thread>> {
        &self.donations
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("tid", &self.tid)
            .field("name", &self.name)
            .field("priority", &self.priority())
            .field("base_priority", &self.base_priority())
            .field("waiting_on_lock", &self.is_waiting_on_lock())
            .finish()
    }
}
