//! Ownership bookkeeping for Database → Connection → Statement handles.
//!
//! Each managed handle owns a [`Node`]. A node counts its open children and
//! records whether the driver-side handle has been released. Children keep
//! their parent's node alive through an `Arc`, so the count can always be
//! decremented, but never keep the parent open on their own: closing the
//! parent is refused while the count is non-zero.
//!
//! Result streams count the same way through a [`ReaderLease`]: a handle
//! whose stream is still being read cannot be released.

use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ManagerError;

/// Handle classes, plus the driver itself for init and release failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Driver,
    Database,
    Connection,
    Statement,
}

impl HandleKind {
    /// Class of handle created underneath this one, if any.
    pub fn child(self) -> Option<HandleKind> {
        match self {
            HandleKind::Driver => Some(HandleKind::Database),
            HandleKind::Database => Some(HandleKind::Connection),
            HandleKind::Connection => Some(HandleKind::Statement),
            HandleKind::Statement => None,
        }
    }
}

impl Display for HandleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HandleKind::Driver => "AdbcDriver",
            HandleKind::Database => "AdbcDatabase",
            HandleKind::Connection => "AdbcConnection",
            HandleKind::Statement => "AdbcStatement",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct NodeState {
    released: bool,
    open_children: usize,
    open_readers: usize,
}

/// Lifecycle node of one managed handle.
#[derive(Debug)]
pub(crate) struct Node {
    kind: HandleKind,
    parent: Option<Arc<Node>>,
    state: Mutex<NodeState>,
}

/// Proof that a node was open when the guard was taken.
///
/// Holding it blocks concurrent close and child registration on the node.
pub(crate) struct OpenGuard<'a> {
    node: &'a Arc<Node>,
    state: MutexGuard<'a, NodeState>,
}

impl Node {
    /// Creates a root node (a Database).
    pub(crate) fn root(kind: HandleKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            parent: None,
            state: Mutex::new(NodeState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the node, failing if it was already released.
    pub(crate) fn guard(self: &Arc<Self>) -> Result<OpenGuard<'_>, ManagerError> {
        let state = self.lock();
        if state.released {
            return Err(ManagerError::closed(self.kind));
        }
        Ok(OpenGuard { node: self, state })
    }

    pub(crate) fn ensure_open(&self) -> Result<(), ManagerError> {
        if self.lock().released {
            return Err(ManagerError::closed(self.kind));
        }
        Ok(())
    }

    pub(crate) fn is_released(&self) -> bool {
        self.lock().released
    }

    pub(crate) fn open_children(&self) -> usize {
        self.lock().open_children
    }

    pub(crate) fn open_readers(&self) -> usize {
        self.lock().open_readers
    }

    fn child_closed(&self) {
        let mut state = self.lock();
        state.open_children = state.open_children.saturating_sub(1);
    }
}

impl OpenGuard<'_> {
    /// Registers a child whose driver handle was fully initialized.
    ///
    /// Called only after construction succeeded, so a failed create never
    /// shows up in the parent's count.
    pub(crate) fn adopt(&mut self, kind: HandleKind) -> Arc<Node> {
        self.state.open_children += 1;
        tracing::trace!(
            parent = %self.node.kind,
            open_children = self.state.open_children,
            "registered child"
        );
        Arc::new(Node {
            kind,
            parent: Some(Arc::clone(self.node)),
            state: Mutex::new(NodeState::default()),
        })
    }

    /// Registers a result stream read from this handle.
    pub(crate) fn lease(mut self) -> ReaderLease {
        self.state.open_readers += 1;
        ReaderLease {
            node: Arc::clone(self.node),
        }
    }

    /// Releases the driver handle exactly once.
    ///
    /// Fails without calling `release` when children or result streams are
    /// still open. The node
    /// is marked released even when `release` reports an error, so the driver
    /// never sees a second release call.
    pub(crate) fn release<T>(
        mut self,
        release: impl FnOnce() -> adbc_core::error::Result<T>,
    ) -> Result<T, ManagerError> {
        if self.state.open_children > 0 {
            let child = self.node.kind.child().unwrap_or(self.node.kind);
            return Err(ManagerError::open_children(
                self.node.kind,
                child,
                self.state.open_children,
            ));
        }
        if self.state.open_readers > 0 {
            return Err(ManagerError::open_readers(
                self.node.kind,
                self.state.open_readers,
            ));
        }
        let result = release();
        self.state.released = true;
        drop(self.state);
        if let Some(parent) = &self.node.parent {
            parent.child_closed();
        }
        tracing::debug!(handle = %self.node.kind, ok = result.is_ok(), "released handle");
        result.map_err(ManagerError::from)
    }
}

/// Marks a result stream as open on the handle that produced it.
pub(crate) struct ReaderLease {
    node: Arc<Node>,
}

impl Drop for ReaderLease {
    fn drop(&mut self) {
        let mut state = self.node.lock();
        state.open_readers = state.open_readers.saturating_sub(1);
    }
}
