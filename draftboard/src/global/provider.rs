//! # Providers
//!
//! Providers give access to some number of open documents, as well as notifications when new ones are added,
//! old ones removed, and current ones modified. It is the source of ownership for the document data!

use draftboard_core::document::{Document, DocumentID};
use draftboard_core::OutlineConfig;

/// A provider that keeps documents in-memory.
pub struct InMemoryDocumentProvider {
    on_change: parking_lot::Mutex<bus::Bus<ProviderMessage>>,
    // We don't expect high contention - will only be locked for writing when a document is opened or closed.
    documents: parking_lot::RwLock<hashbrown::HashMap<DocumentID, Document>>,
}
impl InMemoryDocumentProvider {
    /// Create and insert a new, empty document, returning its new ID.
    pub fn insert_new(&self, config: OutlineConfig) -> DocumentID {
        let document = Document::new(config);
        let id = document.id();
        self.documents.write().insert(id, document);

        self.on_change.lock().broadcast(ProviderMessage::Opened(id));

        id
    }
    /// Insert a document into this provider.
    /// If a document with this ID already exists, the untouched document is returned as an error.
    pub fn insert(&self, document: Document) -> Result<(), Document> {
        let id = document.id();
        match self.documents.write().entry(id) {
            hashbrown::hash_map::Entry::Occupied(_) => return Err(document),
            hashbrown::hash_map::Entry::Vacant(v) => {
                v.insert(document);
            }
        }

        self.on_change.lock().broadcast(ProviderMessage::Opened(id));

        Ok(())
    }
    /// Call the given closure on the document with the given ID, if found.
    /// Listeners are told if the closure modified it.
    pub fn inspect<F, T>(&self, id: DocumentID, f: F) -> Option<T>
    where
        F: FnOnce(&Document) -> T,
    {
        let read = self.documents.read();
        let document = read.get(&id)?;

        // Capture state now, check if it matches after user closure..
        let before = document.revision();
        let result = f(document);
        let modified = document.revision() != before;
        // Avoid locking for any longer than we need to (broadcast may block)
        drop(read);

        if modified {
            self.on_change
                .lock()
                .broadcast(ProviderMessage::Modified(id));
        }

        Some(result)
    }
    /// Remove the document, handing it back. Outstanding readers of it see it closed once it is dropped.
    pub fn close(&self, id: DocumentID) -> Option<Document> {
        let document = self.documents.write().remove(&id)?;
        self.on_change.lock().broadcast(ProviderMessage::Closed(id));
        Some(document)
    }
    /// Iterate over all the open documents, by ID.
    pub fn document_iter(&self) -> impl Iterator<Item = DocumentID> {
        let mut ids: Vec<_> = self.documents.read().keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
    }
    /// Get a reciever of messages describing changes to the provider or it's documents.
    /// Does not recieve old messages, use [`Self::document_iter`] to get up-to-date!
    pub fn change_listener(&self) -> bus::BusReader<ProviderMessage> {
        self.on_change.lock().add_rx()
    }
}
impl Default for InMemoryDocumentProvider {
    fn default() -> Self {
        // Blocks on full, so choose a large number to avoid blocking user thread.
        let on_change = bus::Bus::new(256);
        Self {
            on_change: on_change.into(),
            documents: parking_lot::RwLock::default(),
        }
    }
}
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProviderMessage {
    /// A new document has been made available to the provider.
    Opened(DocumentID),
    /// A document has been modified.
    Modified(DocumentID),
    /// A document is no longer available.
    Closed(DocumentID),
}
pub fn provider() -> &'static InMemoryDocumentProvider {
    static ONCE: std::sync::OnceLock<InMemoryDocumentProvider> = std::sync::OnceLock::new();
    ONCE.get_or_init(Default::default)
}

#[cfg(test)]
mod test {
    use super::*;
    use draftboard_core::scene::NodeKind;

    #[test]
    fn lifecycle_messages() {
        let provider = InMemoryDocumentProvider::default();
        let mut listener = provider.change_listener();
        let id = provider.insert_new(OutlineConfig::default());
        assert_eq!(listener.try_recv(), Ok(ProviderMessage::Opened(id)));

        // Just looking isn't a modification.
        let len = provider.inspect(id, |document| document.read_with(|graph| graph.len()));
        assert_eq!(len, Some(0));
        assert!(listener.try_recv().is_err());

        provider
            .inspect(id, |document| {
                document.write_with(|outline| outline.create_node(NodeKind::Point, "P", None))
            })
            .unwrap()
            .unwrap();
        assert_eq!(listener.try_recv(), Ok(ProviderMessage::Modified(id)));

        let reader = provider.inspect(id, Document::reader).unwrap();
        assert!(provider.close(id).is_some());
        assert_eq!(listener.try_recv(), Ok(ProviderMessage::Closed(id)));
        assert!(reader.snapshot().is_err());
        assert!(provider.inspect(id, |_| ()).is_none());
        assert_eq!(provider.document_iter().count(), 0);
    }
    #[test]
    fn reinsert_after_close() {
        let provider = InMemoryDocumentProvider::default();
        let document = Document::default();
        let id = document.id();
        assert!(provider.insert(document).is_ok());
        let taken = provider.close(id).unwrap();
        assert!(provider.insert(taken).is_ok());
        assert_eq!(provider.document_iter().collect::<Vec<_>>(), vec![id]);
    }
}
