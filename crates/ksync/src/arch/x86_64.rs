// =============================================================================
// MinimalOS NextGen — x86_64 Interrupt Level
// =============================================================================
//
// The interrupt level of an x86_64 core is bit 9 of RFLAGS (IF, Interrupt
// Flag). When IF is set, the core responds to maskable external interrupts,
// including the timer that drives preemption. CLI clears it, STI sets it.
//
// NMIs and machine checks are not maskable and may still arrive; their
// handlers must not touch any primitive in this crate.
//
// STI SHADOW:
//   The instruction right after STI executes before any pending interrupt is
//   delivered, so restoring `On` and immediately returning cannot be
//   interrupted half-way through the restore.
// =============================================================================

use ::x86_64::instructions::interrupts;

use crate::intr::IntrLevel;

/// Reads RFLAGS.IF.
#[inline(always)]
pub fn intr_get_level() -> IntrLevel {
    if interrupts::are_enabled() {
        IntrLevel::On
    } else {
        IntrLevel::Off
    }
}

/// Sets RFLAGS.IF to `level` and returns the previous level.
#[inline(always)]
pub fn intr_set_level(level: IntrLevel) -> IntrLevel {
    let previous = intr_get_level();
    match level {
        IntrLevel::On => interrupts::enable(),
        IntrLevel::Off => interrupts::disable(),
    }
    previous
}
