//! Priority comparators for [`WaitQueue`](crate::wait_queue::WaitQueue).
//!
//! All comparators are pure and total over the priority field: higher
//! priority orders first, equal priorities compare `Equal` so the stable
//! queue operations keep arrival order among them.

use core::cmp::Ordering;

use crate::condvar::WaiterRef;
use crate::thread::Thread;

/// Threads, highest effective priority first.
pub fn by_priority_desc(a: &&Thread, b: &&Thread) -> Ordering {
    b.priority().cmp(&a.priority())
}

/// Condition waiters, ordered by the priority of the thread parked on each
/// private semaphore.
pub(crate) fn by_waiter_priority_desc(a: &WaiterRef, b: &WaiterRef) -> Ordering {
    by_priority_desc(&a.waiter(), &b.waiter())
}
