//! What happened during a [`Machine::run`](crate::Machine::run).

use std::fmt;

/// A fatal assertion (or any other panic) that ended a simulated thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPanic {
    pub thread: &'static str,
    pub message: String,
}

/// Outcome of running a machine until nothing was runnable.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Threads that died by panicking, in the order they died.
    pub panics: Vec<ThreadPanic>,
    /// Threads left blocked forever when the machine halted.
    pub blocked: Vec<&'static str>,
    /// Every thread the scheduler switched to, in order.
    pub switches: Vec<&'static str>,
}

impl Report {
    /// Panics unless every thread ran to completion.
    pub fn assert_clean(&self) {
        assert!(
            self.panics.is_empty() && self.blocked.is_empty(),
            "simulation did not finish cleanly:\n{self}"
        );
    }

    /// Message of the panic that ended `thread`, if it panicked.
    pub fn panic_of(&self, thread: &str) -> Option<&str> {
        self.panics
            .iter()
            .find(|p| p.thread == thread)
            .map(|p| p.message.as_str())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.panics {
            writeln!(f, "  panicked: {}: {}", p.thread, p.message)?;
        }
        if !self.blocked.is_empty() {
            writeln!(f, "  blocked forever: {}", self.blocked.join(", "))?;
        }
        write!(f, "  switches: {}", self.switches.join(" -> "))
    }
}
