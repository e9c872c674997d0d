//! Storage layer: documents and review requests behind a transactional record store.
//!
//! Every backend implements [`RecordStore::transaction`]: the closure works on
//! a private copy of the [`Tables`] and its changes become visible only if it
//! returns `Ok`. Transactions on one store are serialised, which is what makes
//! read-all-then-decide checks such as review fan-in safe.

mod error;
mod file;
mod memory;
mod tables;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use tables::{DocumentPatch, Order, ReviewFilter, ReviewPatch, Tables};

use toeflow_core::{Document, DocumentId, ReviewId, ReviewRequest};

pub trait RecordStore: Send + Sync {
    /// Run `f` atomically. On `Err` nothing `f` did is kept.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tables) -> Result<T, E>,
        E: From<StoreError>;

    /// Run `f` against a consistent read-only view.
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Tables) -> Result<T, E>,
        E: From<StoreError>;

    fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.read(|t| t.get_document(id))
    }

    fn list_documents(&self, order: Order) -> Result<Vec<Document>, StoreError> {
        self.read(|t| Ok(t.list_documents(order)))
    }

    fn create_document(&self, doc: Document) -> Result<Document, StoreError> {
        self.transaction(|t| t.create_document(doc))
    }

    fn update_document(&self, id: &DocumentId, patch: DocumentPatch) -> Result<Document, StoreError> {
        self.transaction(|t| t.update_document(id, patch))
    }

    fn delete_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        self.transaction(|t| t.delete_document(id))
    }

    fn get_review(&self, id: &ReviewId) -> Result<ReviewRequest, StoreError> {
        self.read(|t| t.get_review(id))
    }

    fn filter_reviews(&self, filter: &ReviewFilter) -> Result<Vec<ReviewRequest>, StoreError> {
        self.read(|t| Ok(t.filter_reviews(filter)))
    }

    fn update_review(&self, id: &ReviewId, patch: ReviewPatch) -> Result<ReviewRequest, StoreError> {
        self.transaction(|t| t.update_review(id, patch))
    }
}
