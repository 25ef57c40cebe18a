//! The contract this crate consumes from the scheduler and the interrupt
//! controller.
//!
//! The kernel implements [`Platform`] once and installs it during boot,
//! before the first thread can block:
//!
//! ```ignore
//! static KERNEL: KernelPlatform = KernelPlatform;
//! ksync::platform::install(&KERNEL);
//! ```
//!
//! Every primitive in this crate reaches the scheduler only through the
//! installed platform. Thread records are owned by the scheduler; this crate
//! only ever borrows them (`&'static Thread`).

use spin::Once;

use crate::intr::{IntrGuard, IntrLevel};
use crate::thread::Thread;

/// Scheduler + interrupt controller, as seen from the sync core.
pub trait Platform: Sync {
    /// Current interrupt level of this core.
    fn intr_get_level(&self) -> IntrLevel;

    /// Sets the interrupt level and returns the previous one.
    ///
    /// Calls come in matched, nestable pairs (see [`crate::intr::disable`]).
    fn intr_set_level(&self, level: IntrLevel) -> IntrLevel;

    /// Whether an external interrupt handler is executing.
    fn in_interrupt_context(&self) -> bool;

    /// The running thread.
    fn current_thread(&self) -> &'static Thread;

    /// Suspends the running thread until someone calls [`Platform::unblock`]
    /// on it. Called with interrupts masked; they are masked again when the
    /// call returns.
    fn block(&self, guard: &IntrGuard);

    /// Makes a blocked thread eligible to run, honouring priority order in
    /// the ready queue. Must not preempt the caller; preemption happens in
    /// [`Platform::check_preemption`].
    fn unblock(&self, thread: &'static Thread, guard: &IntrGuard);

    /// Recomputes the effective priority of `thread` from its base priority
    /// and its current donations.
    fn refresh_priority(&self, thread: &'static Thread, guard: &IntrGuard) {
        thread.refresh_priority(guard);
    }

    /// Yields immediately if a ready thread now outranks the running one.
    /// Inside an interrupt handler the yield is deferred to handler return.
    fn check_preemption(&self);
}

static PLATFORM: Once<&'static dyn Platform> = Once::new();

/// Installs the platform. Only the first call has an effect.
pub fn install(platform: &'static dyn Platform) {
    PLATFORM.call_once(|| platform);
}

/// Whether a platform has been installed.
pub fn is_installed() -> bool {
    PLATFORM.is_completed()
}

/// The installed platform.
///
/// # Panics
/// If no platform has been installed; using a primitive before the
/// scheduler exists is a kernel bug.
pub(crate) fn get() -> &'static dyn Platform {
    match PLATFORM.get() {
        Some(platform) => *platform,
        None => panic!("ksync used before platform::install()"),
    }
}
