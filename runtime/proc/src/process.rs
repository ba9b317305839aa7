//! The process record.
//!
//! The per-process spin lock guards only the pointer-valued fields
//! (thread set, address space, working directory, console). It is taken
//! for short swaps and reads, never across substantial work on the
//! objects those fields point to. The exit state lives under its own
//! blocking lock because `wait` suspends the caller.

use std::sync::atomic::{AtomicBool, Ordering};

use krill_sync::{Condvar, Lock};
use spin::Mutex;
use static_assertions::assert_impl_all;

use crate::addrspace::AddressSpace;
use crate::fatal;
use crate::thread::ThreadRef;
use crate::vfs::VnodeRef;

/// Process identifier. Positive, assigned once, never reused.
pub type Pid = u64;

/// Pointer-valued fields, guarded by the per-process spin lock.
pub(crate) struct ProcInner {
    pub(crate) threads: Vec<ThreadRef>,
    pub(crate) addrspace: Option<Box<dyn AddressSpace>>,
    pub(crate) cwd: Option<VnodeRef>,
    pub(crate) console: Option<VnodeRef>,
}

struct ExitStatus {
    exited: bool,
    code: i32,
}

/// A kernel process: the bookkeeping object the scheduler, VM and VFS
/// subsystems hang their per-process state off.
pub struct Process {
    pid: Pid,
    name: String,
    /// Set once, before the creating caller hands out the process, for
    /// processes created to run a program. Plain kernel-side processes
    /// stay clear and are exempt from program-process accounting.
    program: AtomicBool,
    pub(crate) inner: Mutex<ProcInner>,
    children: Mutex<Vec<Pid>>,
    exit_lk: Lock<ExitStatus>,
    exit_cv: Condvar,
}

assert_impl_all!(Process: Send, Sync);

impl Process {
    /// Build a fresh record. Published to callers only via the table,
    /// which is what assigns `pid`.
    pub(crate) fn new(pid: Pid, name: &str) -> Self {
        Self {
            pid,
            name: String::from(name),
            program: AtomicBool::new(false),
            inner: Mutex::new(ProcInner {
                threads: Vec::new(),
                addrspace: None,
                cwd: None,
                console: None,
            }),
            children: Mutex::new(Vec::new()),
            exit_lk: Lock::new("p_exit_lk", ExitStatus {
                exited: false,
                code: 0,
            }),
            exit_cv: Condvar::new("p_exit_cv"),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this process was created to run a program.
    pub fn is_program(&self) -> bool {
        self.program.load(Ordering::Relaxed)
    }

    pub(crate) fn mark_program(&self) {
        self.program.store(true, Ordering::Relaxed);
    }

    // ---- exit/wait rendezvous ----------------------------------------

    /// Publish the exit code and wake every thread blocked in [`wait`].
    ///
    /// A process exits at most once; a second call is an invariant
    /// violation.
    ///
    /// [`wait`]: Process::wait
    pub fn exit(&self, code: i32) {
        let mut status = self.exit_lk.lock();
        if status.exited {
            fatal!(
                "process '{}' (pid {}) exited twice (old code {}, new code {})",
                self.name,
                self.pid,
                status.code,
                code
            );
        }
        status.exited = true;
        status.code = code;
        log::debug!("process '{}' (pid {}) exited with code {}", self.name, self.pid, code);
        self.exit_cv.broadcast();
    }

    /// Block until the process has exited, then return its exit code.
    ///
    /// Any number of threads may wait concurrently; all of them observe
    /// the same code regardless of when they arrived relative to
    /// [`exit`](Process::exit).
    pub fn wait(&self) -> i32 {
        let mut status = self.exit_lk.lock();
        while !status.exited {
            status = self.exit_cv.wait(status);
        }
        status.code
    }

    pub fn has_exited(&self) -> bool {
        self.exit_lk.lock().exited
    }

    /// The exit code, if the process has exited.
    pub fn exit_code(&self) -> Option<i32> {
        let status = self.exit_lk.lock();
        status.exited.then_some(status.code)
    }

    // ---- children bookkeeping ----------------------------------------

    pub(crate) fn add_child(&self, pid: Pid) {
        self.children.lock().push(pid);
    }

    /// PIDs of the children this process created, in creation order.
    pub fn children(&self) -> Vec<Pid> {
        self.children.lock().clone()
    }

    // ---- pointer-valued fields ---------------------------------------

    /// Swap the owned address space, returning the old one. The lock is
    /// held only for the swap itself.
    pub fn swap_addrspace(
        &self,
        new: Option<Box<dyn AddressSpace>>,
    ) -> Option<Box<dyn AddressSpace>> {
        core::mem::replace(&mut self.inner.lock().addrspace, new)
    }

    /// Run `f` against the owned address space under the process lock.
    /// Keep `f` short; the lock is not meant to be held across real work.
    pub fn with_addrspace<R>(&self, f: impl FnOnce(Option<&dyn AddressSpace>) -> R) -> R {
        let inner = self.inner.lock();
        f(inner.addrspace.as_deref())
    }

    pub fn has_addrspace(&self) -> bool {
        self.inner.lock().addrspace.is_some()
    }

    /// Install a working-directory handle, returning the previous one
    /// (which the caller releases by dropping it).
    pub fn set_working_dir(&self, dir: VnodeRef) -> Option<VnodeRef> {
        self.inner.lock().cwd.replace(dir)
    }

    /// Share the working-directory handle, if one is set. The lock is
    /// held only long enough to read and copy the handle.
    pub fn working_dir(&self) -> Option<VnodeRef> {
        self.inner.lock().cwd.as_ref().map(VnodeRef::share)
    }

    pub(crate) fn set_console(&self, console: VnodeRef) {
        self.inner.lock().console = Some(console);
    }

    pub fn has_console(&self) -> bool {
        self.inner.lock().console.is_some()
    }

    pub fn thread_count(&self) -> usize {
        self.inner.lock().threads.len()
    }

    /// Whether `thread` is currently bound to this process.
    pub fn contains_thread(&self, thread: &ThreadRef) -> bool {
        self.inner
            .lock()
            .threads
            .iter()
            .any(|t| std::sync::Arc::ptr_eq(t, thread))
    }

    // ---- teardown ------------------------------------------------------

    /// Release owned and shared resources in the required order. Runs
    /// with exclusive access: the caller proved it holds the sole
    /// reference, so no lock is taken here.
    pub(crate) fn teardown(&mut self) {
        let inner = self.inner.get_mut();

        // Working directory: decrement the shared count; the underlying
        // resource is freed when this was the last holder.
        inner.cwd.take();

        // Address space: deactivate while still attached, detach it from
        // the record, only then destroy it. Destruction may block, and on
        // resume nothing may re-activate a half-destroyed space.
        if let Some(aspace) = inner.addrspace.as_ref() {
            aspace.deactivate();
        }
        if let Some(aspace) = inner.addrspace.take() {
            aspace.destroy();
        }

        inner.console.take();

        if !inner.threads.is_empty() {
            fatal!(
                "process '{}' (pid {}) destroyed with {} thread(s) still bound",
                self.name,
                self.pid,
                inner.threads.len()
            );
        }
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("exited", &self.has_exited())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn wait_after_exit_returns_immediately() {
        let p = Process::new(1, "t");
        assert!(!p.has_exited());
        assert_eq!(p.exit_code(), None);

        p.exit(7);
        assert!(p.has_exited());
        assert_eq!(p.exit_code(), Some(7));
        assert_eq!(p.wait(), 7);
        // wait is repeatable; the code does not change
        assert_eq!(p.wait(), 7);
    }

    #[test]
    fn wait_before_exit_blocks_until_exit() {
        let p = Arc::new(Process::new(1, "t"));
        let woke = Arc::new(AtomicBool::new(false));

        crossbeam::thread::scope(|s| {
            {
                let p = Arc::clone(&p);
                let woke = Arc::clone(&woke);
                s.spawn(move |_| {
                    assert_eq!(p.wait(), 7);
                    woke.store(true, Ordering::SeqCst);
                });
            }

            std::thread::sleep(Duration::from_millis(30));
            assert!(!woke.load(Ordering::SeqCst), "wait returned before exit");
            p.exit(7);
        })
        .unwrap();

        assert!(woke.load(Ordering::SeqCst));
    }

    #[test]
    fn concurrent_waiters_observe_one_code() {
        let p = Arc::new(Process::new(1, "t"));

        crossbeam::thread::scope(|s| {
            let waiters: Vec<_> = (0..2)
                .map(|_| {
                    let p = Arc::clone(&p);
                    s.spawn(move |_| p.wait())
                })
                .collect();

            std::thread::sleep(Duration::from_millis(20));
            p.exit(42);

            for w in waiters {
                assert_eq!(w.join().unwrap(), 42);
            }
        })
        .unwrap();
    }

    #[test]
    #[should_panic(expected = "exited twice")]
    fn double_exit_is_fatal() {
        let p = Process::new(1, "t");
        p.exit(0);
        p.exit(1);
    }

    #[test]
    fn children_kept_in_creation_order() {
        let p = Process::new(1, "parent");
        p.add_child(2);
        p.add_child(5);
        p.add_child(3);
        assert_eq!(p.children(), vec![2, 5, 3]);
    }

    #[test]
    fn working_dir_share_and_replace() {
        let p = Process::new(1, "t");
        assert!(p.working_dir().is_none());

        let root = crate::vfs::mock::MockVfs::vnode("/");
        assert!(p.set_working_dir(root.share()).is_none());
        assert_eq!(root.refcount(), 2);

        let shared = p.working_dir().unwrap();
        assert!(shared.ptr_eq(&root));
        assert_eq!(root.refcount(), 3);
        drop(shared);

        let home = crate::vfs::mock::MockVfs::vnode("/home");
        let old = p.set_working_dir(home.share()).unwrap();
        assert!(old.ptr_eq(&root));
        drop(old);
        assert_eq!(root.refcount(), 1);
    }
}
