//! The address-space contract consumed by process management.
//!
//! A process owns at most one address space and is the only path through
//! which other threads can reach it. Destruction may suspend the calling
//! thread, which is why [`crate::manager::ProcManager::destroy`]
//! deactivates the space and detaches it from the process record before
//! invoking [`AddressSpace::destroy`]: nobody must be able to observe a
//! half-destroyed space through the process while teardown blocks.

/// An opaque virtual address space owned by a process.
pub trait AddressSpace: Send + Sync {
    /// Unload this space from the MMU context of the calling thread.
    /// A no-op when the space is not the active one.
    fn deactivate(&self);

    /// Tear the space down, consuming it. May block.
    fn destroy(self: Box<Self>);
}
