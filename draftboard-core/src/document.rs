//! # Document
//!
//! A shareable handle to one open document. There is a single lock per document: writers hold it for the
//! whole of validate-and-commit, readers hold it just long enough to look or to copy out a snapshot. A reader
//! can never see a half-applied change, such as a node taken out of its old parent but not yet put in its new
//! one.

use std::sync::{Arc, Weak};

use crate::config::OutlineConfig;
use crate::outline::OutlineController;
use crate::scene::{SceneGraph, SceneSnapshot};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct DocumentID(u64);
impl DocumentID {
    fn next() -> Self {
        static NEXT: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
        Self(NEXT.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
    }
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}
impl std::fmt::Display for DocumentID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Document#{}", self.0)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document was closed")]
    Closed,
}

pub struct Document {
    inner: Arc<parking_lot::RwLock<OutlineController>>,
    id: DocumentID,
}
impl Default for Document {
    fn default() -> Self {
        Self::new(OutlineConfig::default())
    }
}
impl Document {
    #[must_use]
    pub fn new(config: OutlineConfig) -> Self {
        Self::from_controller(OutlineController::new(config))
    }
    #[must_use]
    pub fn from_controller(controller: OutlineController) -> Self {
        Self {
            inner: Arc::new(parking_lot::RwLock::new(controller)),
            id: DocumentID::next(),
        }
    }
    #[must_use]
    pub fn id(&self) -> DocumentID {
        self.id
    }
    /// Lock the document for writing for the span of the closure.
    pub fn write_with<T>(&self, write: impl FnOnce(&mut OutlineController) -> T) -> T {
        write(&mut self.inner.write())
    }
    /// Look at the scene under a read lock. Keep it short, writers wait on this.
    pub fn read_with<T>(&self, read: impl FnOnce(&SceneGraph) -> T) -> T {
        read(self.inner.read().graph())
    }
    /// Copy the whole scene out, for holding on to without blocking writers.
    #[must_use]
    pub fn snapshot(&self) -> SceneSnapshot {
        self.read_with(SceneGraph::snapshot)
    }
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.read().revision()
    }
    /// A handle that can look at the document without keeping it open.
    #[must_use]
    pub fn reader(&self) -> DocumentReader {
        DocumentReader {
            inner: Arc::downgrade(&self.inner),
            id: self.id,
        }
    }
}

#[derive(Clone)]
pub struct DocumentReader {
    inner: Weak<parking_lot::RwLock<OutlineController>>,
    id: DocumentID,
}
impl DocumentReader {
    #[must_use]
    pub fn id(&self) -> DocumentID {
        self.id
    }
    pub fn read_with<T>(&self, read: impl FnOnce(&SceneGraph) -> T) -> Result<T, DocumentError> {
        let inner = self.inner.upgrade().ok_or(DocumentError::Closed)?;
        let lock = inner.read();
        Ok(read(lock.graph()))
    }
    pub fn snapshot(&self) -> Result<SceneSnapshot, DocumentError> {
        self.read_with(SceneGraph::snapshot)
    }
}
