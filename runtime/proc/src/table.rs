//! Global process table and PID allocator.
//!
//! The table is an ordered sequence of processes sorted strictly by
//! ascending PID. PIDs come from a monotonic counter and a new process is
//! always appended at the tail, immediately after its PID is allocated,
//! so the sequence stays sorted without ever re-sorting; removal from the
//! middle preserves the relative order of the rest.
//!
//! Allocation, registration, unregistration and lookup all run under one
//! table-wide lock. PID uniqueness depends on allocation being serialized
//! with registration, so the two happen in the same critical section.

use std::sync::Arc;

use krill_sync::Lock;

use crate::error::ProcError;
use crate::process::{Pid, Process};

struct TableInner {
    /// Sorted by ascending PID.
    procs: Vec<Arc<Process>>,
    /// Last PID handed out; 0 means none yet, so the first PID is 1.
    last_pid: Pid,
}

/// The registry mapping PID to process.
///
/// Lives exactly as long as the [`crate::manager::ProcManager`] that owns
/// it; there is no lazy materialization of the storage.
pub struct ProcTable {
    inner: Lock<TableInner>,
    limit: Option<usize>,
}

impl ProcTable {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            inner: Lock::new("proc_table", TableInner {
                procs: Vec::new(),
                last_pid: 0,
            }),
            limit,
        }
    }

    /// Allocate the next PID and register the process `build` makes for
    /// it, atomically. On failure nothing is allocated and nothing is
    /// published.
    pub(crate) fn register_with<F>(&self, build: F) -> Result<Arc<Process>, ProcError>
    where
        F: FnOnce(Pid) -> Process,
    {
        let mut table = self.inner.lock();

        if let Some(limit) = self.limit {
            if table.procs.len() >= limit {
                return Err(ProcError::TableFull { limit });
            }
        }
        let pid = table
            .last_pid
            .checked_add(1)
            .ok_or(ProcError::PidExhausted {
                last: table.last_pid,
            })?;

        table.last_pid = pid;
        let proc = Arc::new(build(pid));
        table.procs.push(Arc::clone(&proc));
        Ok(proc)
    }

    /// Binary search by PID.
    pub fn lookup(&self, pid: Pid) -> Option<Arc<Process>> {
        let table = self.inner.lock();
        table
            .procs
            .binary_search_by_key(&pid, |p| p.pid())
            .ok()
            .map(|idx| Arc::clone(&table.procs[idx]))
    }

    /// Remove a process from the table, returning its registry handle.
    /// `None` when no process with that PID is registered.
    pub(crate) fn unregister(&self, pid: Pid) -> Option<Arc<Process>> {
        let mut table = self.inner.lock();
        let idx = table.procs.binary_search_by_key(&pid, |p| p.pid()).ok()?;
        Some(table.procs.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn pids(&self) -> Vec<Pid> {
        self.inner.lock().procs.iter().map(|p| p.pid()).collect()
    }

    /// Test hook to drive the counter near its end.
    #[cfg(test)]
    pub(crate) fn force_last_pid(&self, last: Pid) {
        self.inner.lock().last_pid = last;
    }
}
