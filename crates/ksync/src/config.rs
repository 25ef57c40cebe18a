//! Compile-time tunables shared by the scheduler and the sync core.

use crate::thread::Priority;

/// Lowest priority a thread can have.
pub const PRI_MIN: Priority = 0;

/// Priority of a thread nobody configured.
pub const PRI_DEFAULT: Priority = 31;

/// Highest priority a thread can have.
pub const PRI_MAX: Priority = 63;

/// Maximum number of `wait_on_lock → holder` hops a single donation walks.
///
/// Caps the cost of one `Lock::acquire` and guarantees the walk terminates
/// even if the wait graph accidentally contains a cycle.
pub const DONATION_DEPTH_MAX: usize = 8;
