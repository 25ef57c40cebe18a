//! Single-thread platform for unit tests.
//!
//! Each test thread is one "kernel thread" that never shares a primitive
//! with another, so nothing ever needs to block. Contended behaviour is
//! covered end-to-end by the `ksim` crate.

use std::boxed::Box;
use std::cell::Cell;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::PRI_DEFAULT;
use crate::intr::{IntrGuard, IntrLevel};
use crate::platform::{self, Platform};
use crate::thread::{Priority, Thread, Tid};

static NEXT_TID: AtomicU32 = AtomicU32::new(1);

std::thread_local! {
    static CURRENT: &'static Thread = leak_thread("test", PRI_DEFAULT);
    static LEVEL: Cell<IntrLevel> = const { Cell::new(IntrLevel::On) };
    static IN_INTERRUPT: Cell<bool> = const { Cell::new(false) };
}

struct SingleThread;

impl Platform for SingleThread {
    fn intr_get_level(&self) -> IntrLevel {
        LEVEL.get()
    }

    fn intr_set_level(&self, level: IntrLevel) -> IntrLevel {
        LEVEL.replace(level)
    }

    fn in_interrupt_context(&self) -> bool {
        IN_INTERRUPT.get()
    }

    fn current_thread(&self) -> &'static Thread {
        CURRENT.with(|t| *t)
    }

    fn block(&self, _guard: &IntrGuard) {
        panic!("unit test would block forever");
    }

    fn unblock(&self, _thread: &'static Thread, _guard: &IntrGuard) {}

    fn check_preemption(&self) {}
}

static PLATFORM: SingleThread = SingleThread;

pub(crate) fn install() {
    platform::install(&PLATFORM);
}

pub(crate) fn leak_thread(name: &'static str, priority: Priority) -> &'static Thread {
    let tid = Tid::from_raw(NEXT_TID.fetch_add(1, Ordering::Relaxed));
    Box::leak(Box::new(Thread::new(tid, name, priority)))
}

pub(crate) fn current() -> &'static Thread {
    CURRENT.with(|t| *t)
}

/// Runs `f` as if it were an interrupt handler.
pub(crate) fn in_interrupt<R>(f: impl FnOnce() -> R) -> R {
    struct Return(IntrLevel);

    impl Drop for Return {
        fn drop(&mut self) {
            IN_INTERRUPT.set(false);
            LEVEL.set(self.0);
        }
    }

    let _return = Return(LEVEL.replace(IntrLevel::Off));
    IN_INTERRUPT.set(true);
    f()
}
