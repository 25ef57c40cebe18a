// =============================================================================
// MinimalOS NextGen — Sleeping Mutex
// =============================================================================
//
// `Mutex<T>` is a `Lock` that owns the data it protects, with the same RAII
// shape as the kernel's `SpinLock<T>`:
//
//     static TABLE: Mutex<Table> = Mutex::new(Table::new());
//
//     {
//         let mut table = TABLE.lock();
//         table.insert(entry);
//     } // released (and donations given back) here
//
// The difference is what happens under contention: a SpinLock burns the CPU
// with interrupts masked, a Mutex puts the caller to sleep and donates its
// priority to the holder. Use a SpinLock for a handful of instructions, a
// Mutex for anything that may take long or sleep while held.
// =============================================================================

use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::lock::Lock;

/// A sleeping lock that owns the data it protects.
///
/// # Examples
///
/// ```ignore
/// static COUNTER: Mutex<u64> = Mutex::new(0);
///
/// *COUNTER.lock() += 1; // released when the guard drops
/// ```
pub struct Mutex<T> {
    lock: Lock,
    /// The protected data. Only reachable through a `MutexGuard`, i.e.
    /// while `lock` is held by the accessing thread.
    data: UnsafeCell<T>,
}

// SAFETY: the lock hands the data to one thread at a time, so the data only
// needs to be transferable between threads.
unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            lock: Lock::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquires the mutex, sleeping (and donating) until it is available.
    ///
    /// # Panics
    /// Same as [`Lock::acquire`]: from an interrupt handler, or if the
    /// caller already holds this mutex.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.lock.acquire();
        MutexGuard { mutex: self }
    }

    /// Acquires the mutex only if it is free. Never sleeps.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.lock.try_acquire().then(|| MutexGuard { mutex: self })
    }

    /// The underlying lock, e.g. to pair it with a [`Condvar`](crate::Condvar).
    pub fn raw(&self) -> &Lock {
        &self.lock
    }

    /// Mutable access without locking; `&mut self` already proves exclusivity.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("holder", &self.lock.holder().map(|t| t.name()))
            .finish_non_exhaustive()
    }
}

/// RAII guard for a held [`Mutex`]. Dropping it releases the mutex.
#[must_use = "dropping the guard immediately releases the mutex"]
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

impl<T> MutexGuard<'_, T> {
    pub(crate) fn raw_lock(&self) -> &Lock {
        &self.mutex.lock
    }
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: we hold the lock, so no other thread can reach the data.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: we hold the lock, so no other thread can reach the data.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn guard_gives_access_and_releases_on_drop() {
        testing::install();
        let mutex = Mutex::new(0u32);
        {
            let mut value = mutex.lock();
            *value += 41;
            assert!(mutex.raw().held_by_current());
        }
        assert!(!mutex.raw().held_by_current());
        *mutex.lock() += 1;
        assert_eq!(mutex.into_inner(), 42);
    }

    #[test]
    fn try_lock_on_free_mutex() {
        testing::install();
        let mutex = Mutex::new([1u8, 2, 3]);
        let guard = mutex.try_lock().expect("free mutex");
        assert_eq!(guard[2], 3);
        drop(guard);
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn get_mut_skips_locking() {
        testing::install();
        let mut mutex = Mutex::new(5i32);
        *mutex.get_mut() = -5;
        assert_eq!(*mutex.lock(), -5);
    }
}
