// =============================================================================
// MinimalOS NextGen — Priority Donation
// =============================================================================
//
// Every thread blocked in `Lock::acquire` records the lock in
// `wait_on_lock`. Following `wait_on_lock → holder` edges gives a chain:
//
//     H ──waits──▶ A ──held by──▶ M ──waits──▶ B ──held by──▶ L
//
// When H blocks, it is inserted into A's holder's donation list and its
// priority flows down the chain: M is raised to H, then L is raised to
// (the now raised) M, and so on.
//
// RULES:
//   - donation only ever RAISES a priority; lowering happens exclusively
//     through `refresh_priority` when a lock is released
//   - the walk stops at a thread that is not waiting on a lock, at a lock
//     without a holder, or after DONATION_DEPTH_MAX hops, whichever comes
//     first; the hop limit also guarantees termination on a cyclic graph
//   - all of it runs with preemption masked, because it writes the
//     priority and linkage fields of threads the scheduler also reads
//
// REVOCATION IS LAZY:
//   Releasing a lock drops, from the releaser's donation list, exactly the
//   donors that were waiting on that lock, and recomputes the releaser's
//   priority. Holders deeper down the chain are not revisited: each of them
//   is blocked on a lock held by someone above it, so it cannot run before
//   that lock is released, and its own release recomputes it from whatever
//   donors it still has.
// =============================================================================

use core::ptr;

use crate::config::DONATION_DEPTH_MAX;
use crate::intr::IntrGuard;
use crate::lock::Lock;
use crate::ordering::by_priority_desc;
use crate::thread::Thread;

/// Donates `donor`'s priority down the chain of lock holders.
///
/// `donor` must be the running thread, about to block on the lock stored in
/// its `wait_on_lock`.
pub(crate) fn donate_priority(donor: &'static Thread, guard: &IntrGuard) {
    // SAFETY: `donor` is inside `Lock::acquire(lock)`, so `lock` is borrowed.
    let Some(lock) = (unsafe { donor.wait_on_lock(guard) }) else {
        return;
    };
    let Some(holder) = lock.holder() else {
        return;
    };
    holder.donations().with_mut(guard, |donations| {
        if !donations.iter().any(|queued| ptr::eq(*queued, donor)) {
            donations.insert_ordered(donor, by_priority_desc);
        }
    });

    let mut walker = donor;
    for hop in 1..=DONATION_DEPTH_MAX {
        // SAFETY: `walker` is either `donor` or a holder that is itself
        // blocked inside `Lock::acquire` (its `wait_on_lock` is non-null only
        // for the duration of that call).
        let Some(lock) = (unsafe { walker.wait_on_lock(guard) }) else {
            break;
        };
        let Some(holder) = lock.holder() else {
            break;
        };
        if holder.priority() < walker.priority() {
            log::trace!(
                "donate: hop {} {} -> {} ({} -> {})",
                hop,
                walker.name(),
                holder.name(),
                holder.priority(),
                walker.priority()
            );
            holder.raise_priority(walker.priority(), guard);
        }
        walker = holder;
    }
}

/// Drops every donation `holder` received because of `lock`.
///
/// Returns the number of donations removed. The caller refreshes `holder`'s
/// priority afterwards.
pub(crate) fn revoke(holder: &Thread, lock: &Lock, guard: &IntrGuard) -> usize {
    let removed = holder.donations().with_mut(guard, |donations| {
        donations.retain(|donor| !donor.is_waiting_on(lock))
    });
    if removed > 0 {
        log::debug!(
            "donate: {} gave back {} donation(s) on release",
            holder.name(),
            removed
        );
    }
    removed
}

/// Turns the threads still queued on `lock` into donors of its new holder.
///
/// Those threads donated to the previous holder, and that donation was
/// revoked when it released the lock. Without re-homing them, a waiter that
/// lost the wake-up race would be left without inversion protection.
pub(crate) fn inherit_waiters(lock: &Lock, holder: &'static Thread, guard: &IntrGuard) {
    lock.semaphore().with_waiters(guard, |waiters| {
        if waiters.is_empty() {
            return;
        }
        holder.donations().with_mut(guard, |donations| {
            for &waiter in waiters.iter().filter(|w| w.is_waiting_on(lock)) {
                donations.insert_ordered(waiter, by_priority_desc);
                holder.raise_priority(waiter.priority(), guard);
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intr;
    use crate::testing::{self, leak_thread};

    #[test]
    fn revoke_only_touches_matching_lock() {
        testing::install();
        let a = Lock::new();
        let b = Lock::new();
        let holder = leak_thread("holder", 1);
        let on_a = leak_thread("on_a", 5);
        let on_b = leak_thread("on_b", 8);

        let guard = intr::disable();
        on_a.set_wait_on_lock(Some(&a), &guard);
        on_b.set_wait_on_lock(Some(&b), &guard);
        holder.donations().with_mut(&guard, |d| {
            d.insert_ordered(on_a, by_priority_desc);
            d.insert_ordered(on_b, by_priority_desc);
        });

        assert_eq!(revoke(holder, &b, &guard), 1);
        holder.refresh_priority(&guard);
        assert_eq!(holder.priority(), 5);
        assert_eq!(revoke(holder, &b, &guard), 0);
        assert_eq!(revoke(holder, &a, &guard), 1);
        holder.refresh_priority(&guard);
        assert_eq!(holder.priority(), 1);

        on_a.set_wait_on_lock(None, &guard);
        on_b.set_wait_on_lock(None, &guard);
    }

    #[test]
    fn donation_raises_holder_and_records_donor() {
        testing::install();
        let lock = Lock::new();
        assert!(lock.try_acquire());
        let me = testing::current();
        let donor = leak_thread("donor", me.priority() + 5);

        let guard = intr::disable();
        donor.set_wait_on_lock(Some(&lock), &guard);
        donate_priority(donor, &guard);
        assert_eq!(me.priority(), donor.priority());
        assert_eq!(me.donors().len(), 1);

        // A waiter that fails again donates again; it is listed once.
        donate_priority(donor, &guard);
        assert_eq!(me.donors().len(), 1);

        revoke(me, &lock, &guard);
        me.refresh_priority(&guard);
        donor.set_wait_on_lock(None, &guard);
        drop(guard);
        lock.release();
        assert_eq!(me.priority(), me.base_priority());
    }
}
