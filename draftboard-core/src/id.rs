//! # IDs
//! Every node of a scene is named by a [`NodeID`], handed out by an [`IdAllocator`]. An allocator never hands
//! out the same ID twice. Order of IDs is not meaningful beyond that.
//!
//! [`Sequential`] is owned by a single scene and is fully deterministic, which is what tests want.
//! [`ProcessUnique`] draws from one counter shared by the whole process, so IDs stay unique across every open
//! document (useful if nodes are ever dragged between documents).

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of a node. Never zero.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct NodeID(NonZeroU64);
impl NodeID {
    /// Get the raw numeric value of this ID.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0.get()
    }
    /// Re-create an ID from its raw value, e.g. one read back from a saved document.
    /// Returns None for zero, which is never a valid ID.
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }
}
impl std::fmt::Display for NodeID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node#{}", self.0)
    }
}
impl std::fmt::Debug for NodeID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <NodeID as std::fmt::Display>::fmt(self, f)
    }
}

/// Source of fresh [`NodeID`]s for a scene.
pub trait IdAllocator: Send + Sync {
    /// Hand out an ID that this allocator has never returned or been told about.
    fn allocate(&mut self) -> NodeID;
    /// Note that `id` is already in use (it was restored from elsewhere) and must never be allocated.
    fn reserve(&mut self, id: NodeID);
}

// Running out of a u64 is not something we can recover from: every later
// allocation would alias an existing node.
fn exhausted(allocator: &str) -> ! {
    if cfg!(test) {
        panic!("{allocator} ID overflow!");
    }
    log::error!("{allocator} ID overflow! Aborting!");
    log::logger().flush();
    std::process::abort()
}

/// Counts up from one. Two scenes using their own `Sequential` will share ID values, which is fine as long
/// as their nodes are never mixed.
#[derive(Clone, Debug)]
pub struct Sequential {
    // Zero means exhausted.
    next: u64,
}
impl Default for Sequential {
    fn default() -> Self {
        Self { next: 1 }
    }
}
impl Sequential {
    /// Start counting at `first` instead of one. Zero is bumped to one.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: first.max(1),
        }
    }
}
impl IdAllocator for Sequential {
    fn allocate(&mut self) -> NodeID {
        let Some(id) = NonZeroU64::new(self.next) else {
            exhausted("Sequential");
        };
        self.next = self.next.wrapping_add(1);
        NodeID(id)
    }
    fn reserve(&mut self, id: NodeID) {
        if self.next != 0 && id.id() >= self.next {
            self.next = id.id().wrapping_add(1);
        }
    }
}

static PROCESS_NEXT: AtomicU64 = AtomicU64::new(1);

/// Allocates from a single process-wide counter.
#[derive(Copy, Clone, Debug, Default)]
pub struct ProcessUnique;
impl IdAllocator for ProcessUnique {
    fn allocate(&mut self) -> NodeID {
        // Zero is latched as "exhausted", never incremented past.
        let previous = PROCESS_NEXT.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
            (next != 0).then(|| next.wrapping_add(1))
        });
        match previous.ok().and_then(NonZeroU64::new) {
            Some(id) => NodeID(id),
            None => exhausted("ProcessUnique"),
        }
    }
    fn reserve(&mut self, id: NodeID) {
        let after = id.id().wrapping_add(1);
        let _ = PROCESS_NEXT.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| {
            if next == 0 {
                None
            } else if after == 0 {
                Some(0)
            } else {
                (after > next).then_some(after)
            }
        });
    }
}
