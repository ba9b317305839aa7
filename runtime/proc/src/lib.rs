//! Process Management - global registry and lifecycle for kernel processes
//!
//! # Purpose
//! Owns the bookkeeping object every other subsystem hangs off: the
//! process. Provides PID allocation, the global process table, process
//! creation/destruction with a strict teardown order, thread-to-process
//! binding, and the exit/wait rendezvous between a dying process and the
//! threads waiting on it.
//!
//! # Integration Points
//! - Depends on: `krill-sync` (blocking lock/condvar/semaphore), the VFS
//!   (consumed through the [`vfs::Vfs`] trait and reference-counted
//!   [`vfs::VnodeRef`] handles), the VM subsystem (consumed through the
//!   opaque [`addrspace::AddressSpace`] trait)
//! - Provides to: spawn/fork/exec syscall handlers, thread start and
//!   teardown paths, exit/waitpid syscall handlers, the VM subsystem
//!
//! # Architecture
//! The [`manager::ProcManager`] owns the [`table::ProcTable`] outright and
//! is handed its collaborators at construction, so every table mutation
//! and PID allocation is serialized under one table-wide lock. Each
//! process carries a narrow spin lock over its pointer-valued fields
//! (thread set, address space, working directory, console) that is never
//! held across substantial work on the referenced objects, plus a
//! dedicated blocking lock and condition variable for the exit state.
//!
//! Errors come in two disjoint classes: resource exhaustion
//! ([`error::ProcError`], recoverable, fully unwound) and invariant
//! violations (the [`fatal!`] macro: a kernel bug, reported and halted,
//! never folded into the recoverable channel).
//!
//! # Testing Strategy
//! - Unit tests per module; concurrent rendezvous tests use scoped threads
//! - Collaborator traits (VFS, address space) are mocked in tests

pub mod addrspace;
pub mod binding;
pub mod error;
pub mod manager;
pub mod process;
pub mod table;
pub mod thread;
pub mod vfs;

pub use addrspace::AddressSpace;
pub use binding::{attach, detach};
pub use error::ProcError;
pub use manager::{ProcConfig, ProcManager, KERNEL_PROC_NAME};
pub use process::{Pid, Process};
pub use table::ProcTable;
pub use thread::{KThread, ThreadRef};
pub use vfs::{OpenFlags, Vfs, VfsError, Vnode, VnodeRef};
