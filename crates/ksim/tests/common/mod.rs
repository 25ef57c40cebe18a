//! Helpers shared by the end-to-end tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};

/// Ordered record of events, appended to from simulated threads and read
/// back on the host once the machine halted.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Names of `thread`'s current donors, highest priority first.
pub fn donor_names(thread: &ksync::Thread) -> Vec<&'static str> {
    thread.donors().iter().map(|t| t.name()).collect()
}
