//! Opt-in architecture backends for the interrupt half of
//! [`Platform`](crate::Platform).
//!
//! Nothing in this crate calls these on its own. A kernel's platform
//! forwards its interrupt methods here and keeps the scheduler half for
//! itself:
//!
//! ```ignore
//! use ksync::arch::x86_64 as cpu;
//!
//! struct KernelPlatform;
//!
//! impl ksync::Platform for KernelPlatform {
//!     fn intr_get_level(&self) -> IntrLevel {
//!         cpu::intr_get_level()
//!     }
//!
//!     fn intr_set_level(&self, level: IntrLevel) -> IntrLevel {
//!         cpu::intr_set_level(level)
//!     }
//!
//!     // in_interrupt_context, current_thread, block, unblock and
//!     // check_preemption come from the scheduler.
//! }
//! ```
//!
//!   x86_64.rs — RFLAGS.IF via CLI/STI (bare-metal x86_64 only)

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod x86_64;
