//! The VFS contract consumed by process management.
//!
//! Process management does not implement a filesystem; it holds on to
//! directory and device resources through [`VnodeRef`], a shared-ownership
//! handle whose reference counting is explicit in the type: [`VnodeRef::share`]
//! increments, dropping a handle decrements and frees the underlying
//! resource on the last release. Handles are deliberately not `Clone` so
//! every new holder goes through `share`.

use std::sync::Arc;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Open modes for [`Vfs::open`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const READ  = 1 << 0;
        const WRITE = 1 << 1;
    }
}

/// An opaque directory or device resource owned by the VFS.
pub trait Vnode: Send + Sync {
    /// The path this vnode was opened under, for diagnostics.
    fn path(&self) -> &str;
}

/// Shared-ownership handle to a [`Vnode`].
pub struct VnodeRef {
    inner: Arc<dyn Vnode>,
}

impl VnodeRef {
    pub fn new(node: Arc<dyn Vnode>) -> Self {
        Self { inner: node }
    }

    /// Take an additional reference to the underlying vnode.
    pub fn share(&self) -> VnodeRef {
        VnodeRef {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn path(&self) -> &str {
        self.inner.path()
    }

    /// Whether two handles refer to the same underlying vnode.
    pub fn ptr_eq(&self, other: &VnodeRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current number of live handles to the underlying vnode.
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl core::fmt::Debug for VnodeRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VnodeRef")
            .field("path", &self.path())
            .field("refcount", &self.refcount())
            .finish()
    }
}

/// Failures reported by the VFS collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    #[error("no such path: {0}")]
    NotFound(String),

    #[error("device rejected open of {path}: {reason}")]
    Rejected { path: String, reason: String },
}

/// The slice of the VFS that process management consumes.
pub trait Vfs: Send + Sync {
    fn open(&self, path: &str, flags: OpenFlags) -> Result<VnodeRef, VfsError>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) struct MockVnode {
        path: String,
    }

    impl Vnode for MockVnode {
        fn path(&self) -> &str {
            &self.path
        }
    }

    /// Hands out fresh vnodes for any path, counting opens.
    pub(crate) struct MockVfs {
        pub(crate) opens: AtomicUsize,
        pub(crate) fail: bool,
    }

    impl MockVfs {
        pub(crate) fn new() -> Self {
            Self {
                opens: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub(crate) fn vnode(path: &str) -> VnodeRef {
            VnodeRef::new(Arc::new(MockVnode {
                path: path.to_string(),
            }))
        }
    }

    impl Vfs for MockVfs {
        fn open(&self, path: &str, _flags: OpenFlags) -> Result<VnodeRef, VfsError> {
            if self.fail {
                return Err(VfsError::NotFound(path.to_string()));
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Self::vnode(path))
        }
    }
}
