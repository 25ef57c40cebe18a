// =============================================================================
// MinimalOS NextGen — Critical Sections
// =============================================================================
//
// On a single core the only thing that can interleave with kernel code is
// asynchronous preemption: the timer interrupt fires, the scheduler picks
// another thread, and that thread touches the same semaphore. Masking
// interrupts for the duration of an operation makes it atomic with respect
// to everything else on the core.
//
// HOW IT WORKS:
//   - `disable()` asks the platform to mask interrupts and remembers the
//     level that was active before.
//   - The returned `IntrGuard` restores that level when it is dropped,
//     on every exit path (early return, `?`, panic unwinding).
//   - Guards nest: an inner guard saw `Off` and restores `Off`, so only the
//     outermost guard re-enables interrupts.
//
// The guard doubles as a proof token. Shared sync state lives in `IrqCell`s,
// and an `IrqCell` can only be opened by handing it a `&IntrGuard`.
//
// A thread may block (and other threads run) while it still owns a guard.
// The level is Off again when it is scheduled back in, so the guard stays
// truthful, but references obtained from an `IrqCell` must never be held
// across a block.
// =============================================================================

use core::cell::UnsafeCell;
use core::marker::PhantomData;

use crate::platform;

/// Interrupt masking state of the current core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrLevel {
    /// Interrupts (and therefore preemption) are masked.
    Off,
    /// Interrupts are delivered.
    On,
}

/// RAII token for a critical section.
///
/// While a guard exists, interrupts are masked on this core. Dropping it
/// restores the level that was active when it was created.
#[must_use = "dropping the guard immediately ends the critical section"]
pub struct IntrGuard {
    /// Level to restore on drop.
    previous: IntrLevel,

    /// The guard describes the state of THIS core and must stay on it.
    _not_send: PhantomData<*mut ()>,
}

impl IntrGuard {
    /// Level that will be restored when this guard is dropped.
    pub fn previous(&self) -> IntrLevel {
        self.previous
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        platform::get().intr_set_level(self.previous);
    }
}

/// Masks interrupts and returns a guard that restores the previous level.
pub fn disable() -> IntrGuard {
    let previous = platform::get().intr_set_level(IntrLevel::Off);
    IntrGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Current interrupt level.
pub fn level() -> IntrLevel {
    platform::get().intr_get_level()
}

/// Whether we are running inside an external interrupt handler.
pub fn in_interrupt_context() -> bool {
    platform::get().in_interrupt_context()
}

// =============================================================================
// IrqCell — data that may only be touched inside a critical section
// =============================================================================

/// Interior-mutable cell whose contents are reachable only through an
/// `IntrGuard`.
///
/// Callers must not nest `with_mut` on the same cell, and must not block
/// inside the closure.
pub(crate) struct IrqCell<T> {
    value: UnsafeCell<T>,
}

// SAFETY: the single core runs one thread at a time and every access goes
// through a guard, i.e. happens with preemption masked. No two accesses can
// overlap as long as the closures below neither nest nor block.
unsafe impl<T: Send> Sync for IrqCell<T> {}

impl<T> IrqCell<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    /// Shared access for the duration of `f`.
    pub(crate) fn with<R>(&self, _guard: &IntrGuard, f: impl FnOnce(&T) -> R) -> R {
        // SAFETY: preemption is masked (guard), see the Sync impl.
        f(unsafe { &*self.value.get() })
    }

    /// Exclusive access for the duration of `f`.
    pub(crate) fn with_mut<R>(&self, _guard: &IntrGuard, f: impl FnOnce(&mut T) -> R) -> R {
        // SAFETY: preemption is masked (guard), see the Sync impl.
        f(unsafe { &mut *self.value.get() })
    }
}

impl<T: Copy> IrqCell<T> {
    pub(crate) fn get(&self, guard: &IntrGuard) -> T {
        self.with(guard, |v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn guard_restores_previous_level() {
        testing::install();
        assert_eq!(level(), IntrLevel::On);
        {
            let guard = disable();
            assert_eq!(guard.previous(), IntrLevel::On);
            assert_eq!(level(), IntrLevel::Off);
        }
        assert_eq!(level(), IntrLevel::On);
    }

    #[test]
    fn nested_guards_only_outermost_enables() {
        testing::install();
        let outer = disable();
        let inner = disable();
        assert_eq!(inner.previous(), IntrLevel::Off);
        drop(inner);
        assert_eq!(level(), IntrLevel::Off);
        drop(outer);
        assert_eq!(level(), IntrLevel::On);
    }

    #[test]
    fn guard_restores_on_early_return() {
        fn bail(flag: bool) -> Option<u32> {
            let _guard = disable();
            if flag {
                return None;
            }
            Some(1)
        }

        testing::install();
        assert_eq!(bail(true), None);
        assert_eq!(level(), IntrLevel::On);
        assert_eq!(bail(false), Some(1));
        assert_eq!(level(), IntrLevel::On);
    }

    #[test]
    fn irq_cell_round_trip_under_guard() {
        testing::install();
        let cell = IrqCell::new(5u32);
        let guard = disable();
        cell.with_mut(&guard, |v| *v = 6);
        assert_eq!(cell.get(&guard), 6);
        cell.with_mut(&guard, |v| *v += 1);
        assert_eq!(cell.with(&guard, |v| *v), 7);
    }
}
