//! Process lifecycle: creation, bootstrap, destruction.
//!
//! The manager owns the process table outright and is handed its VFS
//! collaborator and runtime configuration at construction. What the
//! original material selected with build-time switches (console opening,
//! process-count tracking) is plain configuration here, so there is one
//! code path under test.

use std::sync::{Arc, OnceLock};

use krill_sync::{Lock, Semaphore};

use crate::addrspace::AddressSpace;
use crate::error::ProcError;
use crate::fatal;
use crate::process::{Pid, Process};
use crate::table::ProcTable;
use crate::thread::ThreadRef;
use crate::vfs::{OpenFlags, Vfs};

/// Name of the distinguished kernel process.
pub const KERNEL_PROC_NAME: &str = "[kernel]";

/// Runtime configuration for the lifecycle manager.
#[derive(Debug, Clone)]
pub struct ProcConfig {
    /// Open a console handle for every program process.
    pub console: bool,
    /// Path the console device is reachable under.
    pub console_path: String,
    /// Track the number of live program processes and signal a
    /// supervisory thread when it drops to zero.
    pub track_count: bool,
    /// Upper bound on registered processes, kernel process included.
    pub max_processes: Option<usize>,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            console: true,
            console_path: String::from("con:"),
            track_count: false,
            max_processes: None,
        }
    }
}

/// Owner of the process table and of process lifecycles.
pub struct ProcManager {
    config: ProcConfig,
    table: ProcTable,
    vfs: Arc<dyn Vfs>,
    kproc: OnceLock<Arc<Process>>,
    /// Live program processes; the kernel process is not counted.
    user_count: Lock<usize>,
    /// Signaled when the tracked count reaches zero.
    no_proc_sem: Semaphore,
}

impl ProcManager {
    pub fn new(config: ProcConfig, vfs: Arc<dyn Vfs>) -> Self {
        let table = ProcTable::new(config.max_processes);
        Self {
            config,
            table,
            vfs,
            kproc: OnceLock::new(),
            user_count: Lock::new("proc_count", 0),
            no_proc_sem: Semaphore::new("no_proc_sem", 0),
        }
    }

    // ---- creation -------------------------------------------------------

    /// Create a process and register it. On failure everything allocated
    /// so far is released; a partially constructed process is never
    /// published to the table or to the caller.
    pub fn create(&self, name: &str) -> Result<Arc<Process>, ProcError> {
        let proc = self.table.register_with(|pid| Process::new(pid, name))?;
        log::debug!("created process '{}' (pid {})", name, proc.pid());
        Ok(proc)
    }

    /// Create the distinguished kernel process and store it as the
    /// singleton every purely-kernel thread belongs to. The kernel cannot
    /// proceed without it, so failure here is fatal.
    pub fn bootstrap(&self) -> Arc<Process> {
        let kproc = match self.create(KERNEL_PROC_NAME) {
            Ok(p) => p,
            Err(e) => fatal!("kernel process creation failed: {e}"),
        };
        if self.kproc.set(Arc::clone(&kproc)).is_err() {
            fatal!("process bootstrap ran twice");
        }
        log::info!("process subsystem bootstrapped, kernel process has pid {}", kproc.pid());
        kproc
    }

    /// The kernel process. Fatal before [`bootstrap`](ProcManager::bootstrap).
    pub fn kproc(&self) -> &Arc<Process> {
        self.kproc
            .get()
            .unwrap_or_else(|| fatal!("process subsystem used before bootstrap"))
    }

    /// Create a fresh process for a runnable program.
    ///
    /// The process gets a console handle (when configured; opening it
    /// must always succeed in a healthy boot, so failure is fatal) and
    /// inherits the working directory of the calling thread's process,
    /// which also records the new PID in its children list. `current` is
    /// `None` for callers running before any binding exists.
    pub fn create_for_program(
        &self,
        name: &str,
        current: Option<&ThreadRef>,
    ) -> Result<Arc<Process>, ProcError> {
        let proc = self.create(name)?;
        proc.mark_program();

        if self.config.console {
            let console = match self.vfs.open(&self.config.console_path, OpenFlags::WRITE) {
                Ok(v) => v,
                Err(e) => fatal!("unable to open the console during process creation: {e}"),
            };
            proc.set_console(console);
        }

        if let Some(parent) = current.and_then(|t| t.owner()) {
            // working_dir() holds the parent's lock only long enough to
            // read and copy the handle; the shared count moves with it.
            if let Some(cwd) = parent.working_dir() {
                proc.set_working_dir(cwd);
            }
            parent.add_child(proc.pid());
        }

        if self.config.track_count {
            *self.user_count.lock() += 1;
        }

        Ok(proc)
    }

    // ---- destruction ----------------------------------------------------

    /// Destroy a process.
    ///
    /// Preconditions: `proc` is not the kernel process, every thread has
    /// been detached from it, and the caller holds the only remaining
    /// reference outside the table. All three are enforced, fatally.
    ///
    /// Teardown order: unregister first so concurrent lookups fail fast,
    /// then release shared and owned resources, then free the record.
    pub fn destroy(&self, proc: Arc<Process>) {
        if let Some(kproc) = self.kproc.get() {
            if Arc::ptr_eq(kproc, &proc) {
                fatal!("attempt to destroy the kernel process");
            }
        }

        let pid = proc.pid();
        let registered = match self.table.unregister(pid) {
            Some(p) => p,
            None => fatal!("destroy of process pid {}, which is not registered", pid),
        };
        drop(registered);

        // Only program processes were counted at creation; plain kernel
        // processes must not disturb the count on their way out.
        let counted = self.config.track_count && proc.is_program();

        // With the table's handle gone, the caller's must be the last.
        let mut proc = Arc::try_unwrap(proc).unwrap_or_else(|_| {
            fatal!("destroy of process pid {} with outstanding references", pid)
        });

        proc.teardown();
        log::debug!("destroyed process '{}' (pid {})", proc.name(), pid);
        drop(proc);

        if counted {
            let mut count = self.user_count.lock();
            if *count == 0 {
                fatal!("program process count underflow destroying pid {}", pid);
            }
            *count -= 1;
            if *count == 0 {
                self.no_proc_sem.release();
            }
        }
    }

    // ---- registry access --------------------------------------------------

    pub fn lookup(&self, pid: Pid) -> Option<Arc<Process>> {
        self.table.lookup(pid)
    }

    /// Number of registered processes, kernel process included.
    pub fn process_count(&self) -> usize {
        self.table.len()
    }

    /// Block the supervisory caller until no program processes remain.
    /// Only meaningful with count tracking configured.
    pub fn wait_until_idle(&self) {
        if !self.config.track_count {
            fatal!("wait_until_idle without process count tracking configured");
        }
        self.no_proc_sem.acquire();
    }

    // ---- address space of the calling thread's process -------------------

    /// Run `f` against the address space of `current`'s process. Kernel
    /// test threads may run before any binding exists; they see `None`.
    pub fn with_addrspace<R>(
        &self,
        current: &ThreadRef,
        f: impl FnOnce(Option<&dyn AddressSpace>) -> R,
    ) -> R {
        match current.owner() {
            Some(proc) => proc.with_addrspace(f),
            None => f(None),
        }
    }

    /// Swap the address space of `current`'s process, returning the old
    /// one. The calling thread must be bound to a process.
    pub fn swap_addrspace(
        &self,
        current: &ThreadRef,
        new: Option<Box<dyn AddressSpace>>,
    ) -> Option<Box<dyn AddressSpace>> {
        let Some(proc) = current.owner() else {
            fatal!(
                "address-space swap on thread '{}', which is bound to no process",
                current.name()
            );
        };
        proc.swap_addrspace(new)
    }
}
