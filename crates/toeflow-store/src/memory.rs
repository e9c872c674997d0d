//! In-memory record store. All records are lost on drop.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::{RecordStore, StoreError, Tables};

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing tables, e.g. fixtures.
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: Mutex::new(tables),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Other(format!("store mutex poisoned: {e}")))
    }
}

impl RecordStore for MemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tables) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        match f(&mut working) {
            Ok(value) => {
                *guard = working;
                Ok(value)
            }
            Err(err) => {
                debug!("transaction rolled back");
                Err(err)
            }
        }
    }

    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Tables) -> Result<T, E>,
        E: From<StoreError>,
    {
        let guard = self.lock()?;
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use toeflow_core::{Actor, Document, DocumentStatus, NewDocument};

    use crate::DocumentPatch;

    fn doc() -> Document {
        Document::new(
            NewDocument::default(),
            &Actor::new("a@firm.example", "A"),
            Utc::now(),
            0.15,
        )
    }

    #[test]
    fn committed_transaction_is_visible() {
        let store = MemoryStore::new();
        let created = store.create_document(doc()).unwrap();
        assert_eq!(store.get_document(&created.id).unwrap(), created);
    }

    #[test]
    fn failed_transaction_rolls_back_every_change() {
        let store = MemoryStore::new();
        let created = store.create_document(doc()).unwrap();

        let result: Result<(), StoreError> = store.transaction(|t| {
            t.update_document(
                &created.id,
                DocumentPatch {
                    status: Some(DocumentStatus::Sent),
                    ..DocumentPatch::default()
                },
            )?;
            t.create_document(doc())?;
            Err(StoreError::Other("boom".into()))
        });

        assert!(result.is_err());
        let stored = store.get_document(&created.id).unwrap();
        assert_eq!(stored.status, DocumentStatus::Draft);
        assert_eq!(store.list_documents(Default::default()).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_transactions_are_serialised() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .transaction(|t| -> Result<(), StoreError> {
                            let before = t.document_count();
                            t.create_document(doc())?;
                            assert_eq!(t.document_count(), before + 1);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.list_documents(Default::default()).unwrap().len(), 8);
    }
}
