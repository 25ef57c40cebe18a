//! The simulated core: thread table, ready queue, and the baton that decides
//! which host thread may run.
//!
//! Exactly one simulated thread is `Running` at any time. Every other host
//! thread backing a simulated thread is parked on `wakeup` until the
//! scheduler hands it the core by setting `running` to it. All scheduler
//! state lives behind one host mutex; the sync core never sees it.

use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use ksync::ordering::by_priority_desc;
use ksync::{IntrLevel, Priority, Thread, Tid, WaitQueue};

use crate::platform::{self, Context};
use crate::report::{Report, ThreadPanic};

// ── Thread table ────────────────────────────────────────────────

/// Scheduling state of a simulated thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ready,
    Running,
    Blocked,
    Exited,
}

struct Slot {
    thread: &'static Thread,
    status: Status,
}

struct State {
    threads: Vec<Slot>,
    /// Ready threads, highest priority first. Re-sorted before each pick
    /// because donations change priorities of queued threads.
    ready: WaitQueue<&'static Thread>,
    running: Option<&'static Thread>,
    intr: IntrLevel,
    in_interrupt: bool,
    /// A preemption was requested inside an interrupt handler.
    yield_on_return: bool,
    booted: bool,
    /// Nothing is runnable any more; `run` may return.
    halted: bool,
    panics: Vec<ThreadPanic>,
    switches: Vec<&'static str>,
}

impl State {
    fn slot_mut(&mut self, thread: &Thread) -> &mut Slot {
        match self.threads.iter_mut().find(|s| ptr::eq(s.thread, thread)) {
            Some(slot) => slot,
            None => panic!("thread {} is not known to this machine", thread.name()),
        }
    }

    fn is_running(&self, thread: &Thread) -> bool {
        self.running.is_some_and(|r| ptr::eq(r, thread))
    }
}

// ── Machine ─────────────────────────────────────────────────────

/// One simulated single-core machine.
pub struct Machine {
    state: Mutex<State>,
    wakeup: Condvar,
    next_tid: AtomicU32,
}

impl Machine {
    /// Creates a powered-off machine and installs the simulator platform.
    pub fn new() -> Arc<Self> {
        platform::install();
        crate::logger::init();
        Arc::new(Self {
            state: Mutex::new(State {
                threads: Vec::new(),
                ready: WaitQueue::new(),
                running: None,
                intr: IntrLevel::Off,
                in_interrupt: false,
                yield_on_return: false,
                booted: false,
                halted: false,
                panics: Vec::new(),
                switches: Vec::new(),
            }),
            wakeup: Condvar::new(),
            next_tid: AtomicU32::new(1),
        })
    }

    /// Boots the machine with `body` as its first thread and runs until no
    /// thread is runnable.
    ///
    /// Threads still blocked at that point stay blocked forever; they are
    /// listed in the report.
    ///
    /// # Panics
    /// If the machine was already booted.
    pub fn run<F>(self: &Arc<Self>, name: &'static str, priority: Priority, body: F) -> Report
    where
        F: FnOnce() + Send + 'static,
    {
        self.create_thread(name, priority, body);
        let mut st = self.lock();
        assert!(!st.booted, "machine already booted");
        st.booted = true;
        self.pick_next(&mut st);
        while !st.halted {
            st = self.wait(st);
        }
        log::debug!("ksim: halted after {} switches", st.switches.len());

        Report {
            panics: mem::take(&mut st.panics),
            blocked: st
                .threads
                .iter()
                .filter(|s| s.status == Status::Blocked)
                .map(|s| s.thread.name())
                .collect(),
            switches: mem::take(&mut st.switches),
        }
    }

    // ── Thread lifecycle ────────────────────────────────────────

    /// Creates a simulated thread in the `Ready` state, backed by a parked
    /// host thread.
    pub(crate) fn create_thread<F>(
        self: &Arc<Self>,
        name: &'static str,
        priority: Priority,
        body: F,
    ) -> &'static Thread
    where
        F: FnOnce() + Send + 'static,
    {
        let tid = Tid::from_raw(self.next_tid.fetch_add(1, Ordering::Relaxed));
        let thread: &'static Thread = Box::leak(Box::new(Thread::new(tid, name, priority)));
        {
            let mut st = self.lock();
            st.threads.push(Slot {
                thread,
                status: Status::Ready,
            });
            st.ready.insert_ordered(thread, by_priority_desc);
        }

        let machine = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(String::from(name))
            .spawn(move || machine.thread_main(thread, body));
        if let Err(err) = spawned {
            panic!("ksim: cannot back thread {name} with a host thread: {err}");
        }
        log::debug!("ksim: created {} (tid {}, priority {})", name, tid, priority);
        thread
    }

    fn thread_main<F: FnOnce()>(self: Arc<Self>, thread: &'static Thread, body: F) {
        platform::enter(Context {
            machine: Arc::clone(&self),
            thread,
        });
        {
            let mut st = self.lock();
            while !st.is_running(thread) {
                st = self.wait(st);
            }
            // Fresh kernel threads start with interrupts enabled.
            st.intr = IntrLevel::On;
        }

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
            let message = panic_message(payload.as_ref());
            log::error!("ksim: thread {} panicked: {}", thread.name(), message);
            self.lock().panics.push(ThreadPanic {
                thread: thread.name(),
                message,
            });
        }
        self.exit(thread);
    }

    fn exit(&self, thread: &'static Thread) {
        let mut st = self.lock();
        st.slot_mut(thread).status = Status::Exited;
        self.pick_next(&mut st);
    }

    // ── Scheduler operations ────────────────────────────────────

    pub(crate) fn block(&self, thread: &'static Thread) {
        let mut st = self.lock();
        assert_eq!(st.intr, IntrLevel::Off, "thread_block with interrupts on");
        assert!(!st.in_interrupt, "thread_block from interrupt context");
        st.slot_mut(thread).status = Status::Blocked;
        drop(self.switch_away(st, thread));
    }

    pub(crate) fn unblock(&self, thread: &'static Thread) {
        let mut st = self.lock();
        let slot = st.slot_mut(thread);
        assert_eq!(
            slot.status,
            Status::Blocked,
            "thread_unblock on a thread that is not blocked"
        );
        slot.status = Status::Ready;
        st.ready.insert_ordered(thread, by_priority_desc);
    }

    /// Puts `thread` back on the ready queue and runs the best ready thread,
    /// which may be `thread` itself.
    pub(crate) fn yield_current(&self, thread: &'static Thread) {
        let mut st = self.lock();
        assert!(!st.in_interrupt, "thread_yield from interrupt context");
        st.slot_mut(thread).status = Status::Ready;
        st.ready.insert_ordered(thread, by_priority_desc);
        let level = st.intr;
        let mut st = self.switch_away(st, thread);
        st.intr = level;
    }

    pub(crate) fn check_preemption(&self, thread: &'static Thread) {
        let mut st = self.lock();
        if st.in_interrupt {
            st.yield_on_return = true;
            return;
        }
        st.ready.sort(by_priority_desc);
        let outranked = st
            .ready
            .front()
            .is_some_and(|best| best.priority() > thread.priority());
        drop(st);
        if outranked {
            self.yield_current(thread);
        }
    }

    pub(crate) fn intr_level(&self) -> IntrLevel {
        self.lock().intr
    }

    pub(crate) fn set_intr_level(&self, level: IntrLevel) -> IntrLevel {
        mem::replace(&mut self.lock().intr, level)
    }

    pub(crate) fn in_interrupt(&self) -> bool {
        self.lock().in_interrupt
    }

    /// Runs `handler` as an external interrupt arriving on top of `thread`.
    pub(crate) fn interrupt<R>(&self, thread: &'static Thread, handler: impl FnOnce() -> R) -> R {
        struct HandlerReturn<'m> {
            machine: &'m Machine,
            level: IntrLevel,
        }

        impl Drop for HandlerReturn<'_> {
            fn drop(&mut self) {
                let mut st = self.machine.lock();
                st.in_interrupt = false;
                st.intr = self.level;
            }
        }

        let level = {
            let mut st = self.lock();
            assert!(!st.in_interrupt, "nested interrupts are not simulated");
            st.in_interrupt = true;
            mem::replace(&mut st.intr, IntrLevel::Off)
        };
        let result = {
            let _return = HandlerReturn {
                machine: self,
                level,
            };
            handler()
        };

        let pending = mem::take(&mut self.lock().yield_on_return);
        if pending {
            self.yield_current(thread);
        }
        result
    }

    // ── Context switching ───────────────────────────────────────

    /// Gives the core away and waits until the scheduler hands it back to
    /// `me`.
    fn switch_away<'a>(
        &'a self,
        mut st: MutexGuard<'a, State>,
        me: &'static Thread,
    ) -> MutexGuard<'a, State> {
        self.pick_next(&mut st);
        while !st.is_running(me) {
            st = self.wait(st);
        }
        st
    }

    fn pick_next(&self, st: &mut State) {
        st.ready.sort(by_priority_desc);
        match st.ready.pop_front() {
            Some(next) => {
                st.slot_mut(next).status = Status::Running;
                st.running = Some(next);
                st.intr = IntrLevel::Off;
                st.switches.push(next.name());
                log::trace!("ksim: switch to {} (priority {})", next.name(), next.priority());
            }
            None => {
                st.running = None;
                st.halted = true;
            }
        }
        self.wakeup.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A simulated thread may panic while the scheduler lock is held (a
        // failed scheduler assertion). The state is still consistent enough
        // to keep scheduling the others.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, st: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.wakeup.wait(st).unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        String::from(*message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("<non-string panic payload>")
    }
}
