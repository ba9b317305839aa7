//! Thread-to-process binding.
//!
//! Either the thread or the process might or might not be the current
//! one; binding only touches the process's thread set and the thread's
//! owning-process field. Binding a thread twice, detaching an unbound
//! thread, or finding a thread missing from its recorded owner's set are
//! programming errors and fail loudly.

use std::sync::Arc;

use crate::fatal;
use crate::process::Process;
use crate::thread::ThreadRef;

/// Bind `thread` to `process`.
///
/// The thread must not currently be bound to any process. The thread set
/// is extended under the process lock; the thread's owning-process field
/// is only written once the append has happened.
pub fn attach(process: &Arc<Process>, thread: &ThreadRef) {
    let mut owner = thread.owner_slot().lock();
    if owner.is_some() {
        fatal!(
            "thread '{}' is already bound to a process; refusing to rebind to '{}' (pid {})",
            thread.name(),
            process.name(),
            process.pid()
        );
    }

    process.inner.lock().threads.push(Arc::clone(thread));
    *owner = Some(Arc::downgrade(process));
    log::trace!(
        "thread '{}' attached to process '{}' (pid {})",
        thread.name(),
        process.name(),
        process.pid()
    );
}

/// Unbind `thread` from its owning process.
pub fn detach(thread: &ThreadRef) {
    let mut owner = thread.owner_slot().lock();
    let weak = match owner.as_ref() {
        Some(weak) => weak.clone(),
        None => fatal!("detach of thread '{}', which is bound to no process", thread.name()),
    };
    let Some(process) = weak.upgrade() else {
        fatal!(
            "thread '{}' outlived the process it was bound to",
            thread.name()
        );
    };

    let mut inner = process.inner.lock();
    let pos = inner
        .threads
        .iter()
        .position(|t| Arc::ptr_eq(t, thread));
    match pos {
        Some(idx) => {
            inner.threads.remove(idx);
        }
        None => {
            fatal!(
                "thread '{}' has escaped from its process '{}' (pid {})",
                thread.name(),
                process.name(),
                process.pid()
            );
        }
    }
    drop(inner);

    *owner = None;
    log::trace!(
        "thread '{}' detached from process '{}' (pid {})",
        thread.name(),
        process.name(),
        process.pid()
    );
}
