// =============================================================================
// MinimalOS NextGen — Host-Side Uniprocessor Simulator
// =============================================================================
//
// Runs ksync on an ordinary host with the scheduling behaviour of the
// kernel: one core, strict priority, FIFO among equals.
//
//   machine.rs  — thread table, ready queue, context switch baton
//   platform.rs — ksync::Platform dispatching to the calling thread's machine
//   report.rs   — panics, leftover blocked threads, switch trace
//   logger.rs   — `log` backend in the kernel console format
//
// The free functions below are only meaningful inside a simulated thread,
// i.e. inside the body passed to `Machine::run` or `spawn`.
// =============================================================================

pub mod logger;
mod machine;
mod platform;
mod report;

use ksync::{intr, Priority, Thread};

pub use machine::Machine;
pub use report::{Report, ThreadPanic};

/// Boots a fresh machine running `body` as its first thread.
pub fn run<F>(name: &'static str, priority: Priority, body: F) -> Report
where
    F: FnOnce() + Send + 'static,
{
    Machine::new().run(name, priority, body)
}

/// Creates a ready thread. The caller is preempted right away if the new
/// thread outranks it.
pub fn spawn<F>(name: &'static str, priority: Priority, body: F) -> &'static Thread
where
    F: FnOnce() + Send + 'static,
{
    let (machine, me) = platform::context();
    let thread = machine.create_thread(name, priority, body);
    machine.check_preemption(me);
    thread
}

/// Lets the best ready thread run; returns immediately if that is still us.
pub fn yield_now() {
    let (machine, me) = platform::context();
    machine.yield_current(me);
}

/// Sets the current thread's base priority. Donations it holds still apply;
/// if it no longer has the highest priority it yields.
pub fn set_priority(priority: Priority) {
    let (machine, me) = platform::context();
    {
        let guard = intr::disable();
        me.set_base_priority(priority, &guard);
    }
    machine.check_preemption(me);
}

/// The running simulated thread.
pub fn current() -> &'static Thread {
    platform::context().1
}

/// Runs `handler` as an external interrupt arriving on the current thread.
///
/// Inside the handler interrupts are off and `intr::in_interrupt_context()`
/// is true. A preemption requested by the handler happens when it returns.
pub fn interrupt<R>(handler: impl FnOnce() -> R) -> R {
    let (machine, me) = platform::context();
    machine.interrupt(me, handler)
}
