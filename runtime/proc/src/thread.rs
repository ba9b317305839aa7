//! The thread handle consumed by process management.
//!
//! The scheduler owns the real thread structure; this core touches
//! exactly one field of it, the owning-process back-reference. The
//! back-reference is weak so a thread handle never keeps its process
//! alive on its own; a dead reference at detach time is the same class
//! of invariant violation as an escaped thread.

use std::sync::{Arc, Weak};

use spin::Mutex;

use crate::process::Process;

/// Shared handle to a kernel thread.
pub type ThreadRef = Arc<KThread>;

/// The process-management view of a kernel thread.
pub struct KThread {
    name: String,
    owner: Mutex<Option<Weak<Process>>>,
}

impl KThread {
    pub fn new(name: &str) -> ThreadRef {
        Arc::new(Self {
            name: String::from(name),
            owner: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The process this thread is currently bound to, if any.
    pub fn owner(&self) -> Option<Arc<Process>> {
        self.owner.lock().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_bound(&self) -> bool {
        self.owner.lock().is_some()
    }

    pub(crate) fn owner_slot(&self) -> &Mutex<Option<Weak<Process>>> {
        &self.owner
    }
}
