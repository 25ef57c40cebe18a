//! `ksync::Platform` on top of the simulated machine.
//!
//! The platform is a single global (the sync core has exactly one), but
//! several machines may be running at once in one test binary. Each host
//! thread backing a simulated thread therefore carries a [`Context`] naming
//! its machine and its own thread record, and the platform dispatches
//! through it.

use std::cell::RefCell;
use std::sync::Arc;

use ksync::{IntrGuard, IntrLevel, Platform, Thread};

use crate::machine::Machine;

pub(crate) struct Context {
    pub(crate) machine: Arc<Machine>,
    pub(crate) thread: &'static Thread,
}

std::thread_local! {
    static CONTEXT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// Binds the calling host thread to a simulated thread.
pub(crate) fn enter(context: Context) {
    CONTEXT.with(|c| *c.borrow_mut() = Some(context));
}

/// Machine and thread record of the calling simulated thread.
///
/// # Panics
/// When called from a host thread that is not a simulated thread.
pub(crate) fn context() -> (Arc<Machine>, &'static Thread) {
    CONTEXT.with(|c| match c.borrow().as_ref() {
        Some(ctx) => (Arc::clone(&ctx.machine), ctx.thread),
        None => panic!("ksim: not running on a simulated thread"),
    })
}

struct SimPlatform;

impl Platform for SimPlatform {
    fn intr_get_level(&self) -> IntrLevel {
        context().0.intr_level()
    }

    fn intr_set_level(&self, level: IntrLevel) -> IntrLevel {
        context().0.set_intr_level(level)
    }

    fn in_interrupt_context(&self) -> bool {
        context().0.in_interrupt()
    }

    fn current_thread(&self) -> &'static Thread {
        context().1
    }

    fn block(&self, _guard: &IntrGuard) {
        let (machine, thread) = context();
        machine.block(thread);
    }

    fn unblock(&self, thread: &'static Thread, _guard: &IntrGuard) {
        context().0.unblock(thread);
    }

    fn check_preemption(&self) {
        let (machine, thread) = context();
        machine.check_preemption(thread);
    }
}

static SIM: SimPlatform = SimPlatform;

pub(crate) fn install() {
    ksync::platform::install(&SIM);
}
