// =============================================================================
// MinimalOS NextGen — Sleeping Synchronization Primitives
// =============================================================================
//
// Everything in this crate puts the calling thread to SLEEP instead of
// spinning. It is the layer every subsystem that can wait for something
// (device drivers, IPC endpoints, the VFS) is built on.
//
//   intr.rs       — critical sections (interrupt masking guard)
//   wait_queue.rs — comparator-ordered wait queues
//   ordering.rs   — priority comparators for those queues
//   thread.rs     — the sync-visible part of a thread record
//   semaphore.rs  — counting semaphore
//   lock.rs       — binary lock with an owner
//   donation.rs   — priority donation between lock waiters and holders
//   condvar.rs    — Mesa-style condition variable
//   mutex.rs      — a Lock that owns the data it protects
//   platform.rs   — the scheduler/interrupt contract we consume
//
// Control flows top-down:
//   Condvar → Lock → Semaphore → (intr guard + WaitQueue)
// and donation reaches sideways into other threads' records.
//
// SINGLE CORE ONLY:
//   Atomicity comes from masking preemption on the one core we run on.
//   There is no cross-core memory ordering anywhere in here.
// =============================================================================

#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), forbid(clippy::unwrap_used))]

extern crate alloc;

pub mod arch;
pub mod condvar;
pub mod config;
pub mod donation;
pub mod intr;
pub mod lock;
pub mod mutex;
pub mod ordering;
pub mod platform;
pub mod semaphore;
pub mod thread;
pub mod wait_queue;

#[cfg(test)]
mod testing;

pub use condvar::Condvar;
pub use config::{DONATION_DEPTH_MAX, PRI_DEFAULT, PRI_MAX, PRI_MIN};
pub use intr::{IntrGuard, IntrLevel};
pub use lock::Lock;
pub use mutex::{Mutex, MutexGuard};
pub use platform::Platform;
pub use semaphore::Semaphore;
pub use thread::{Priority, Thread, Tid};
pub use wait_queue::WaitQueue;

static_assertions::assert_impl_all!(Semaphore: Send, Sync);
static_assertions::assert_impl_all!(Lock: Send, Sync);
static_assertions::assert_impl_all!(Condvar: Send, Sync);
static_assertions::assert_impl_all!(Thread: Send, Sync);
static_assertions::assert_not_impl_any!(IntrGuard: Send, Sync);
