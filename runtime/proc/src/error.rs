//! Error types for process management.
//!
//! Two disjoint classes. [`ProcError`] is the recoverable
//! resource-exhaustion class: creation unwinds everything allocated so
//! far and hands the error back. The [`fatal!`] macro is the
//! unrecoverable class: an invariant violation is a kernel bug, so the
//! offending path is reported and halted instead of limping on in a
//! known-inconsistent state.

use thiserror::Error;

use crate::process::Pid;

/// Recoverable failures while creating or registering a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcError {
    /// The monotonic PID counter ran out. PIDs are never recycled.
    #[error("pid space exhausted (last pid {last})")]
    PidExhausted { last: Pid },

    /// The configured process limit is reached.
    #[error("process table is full (limit {limit})")]
    TableFull { limit: usize },
}

/// Report an invariant violation and halt the offending path.
///
/// Logs at error level before panicking so the diagnostic reaches the
/// console even when the panic payload is swallowed by an outer handler.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        ::log::error!($($arg)*);
        ::core::panic!($($arg)*);
    }};
}
