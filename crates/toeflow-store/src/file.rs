//! JSON file-backed record store.
//!
//! The whole table set lives in one pretty-printed JSON file. A commit writes
//! a temporary file next to the target and renames it into place, so readers
//! never observe a half-written store.
//!
//! Every access holds an advisory lock on a `<file>.lock` sidecar and reloads
//! the tables from disk, so separate handles (and separate processes) on the
//! same path see each other's commits and never interleave a transaction.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{RecordStore, StoreError, Tables};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    /// The file itself is created on the first commit.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut lock_name = OsString::from(path.file_name().unwrap_or_default());
        lock_name.push(".lock");
        let store = Self {
            lock_path: path.with_file_name(lock_name),
            path,
        };

        let lock = store.lock_file()?;
        FileExt::lock_shared(&lock)?;
        let tables = store.load()?;
        if store.path.exists() {
            info!(
                path = %store.path.display(),
                documents = tables.document_count(),
                reviews = tables.review_count(),
                "loaded record store"
            );
        } else {
            info!(path = %store.path.display(), "starting empty record store");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    // Released when the returned handle drops.
    fn lock_file(&self) -> Result<File, StoreError> {
        fs::create_dir_all(self.dir())?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn load(&self) -> Result<Tables, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Tables::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        serde_json::to_writer_pretty(&mut tmp, tables)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;
        debug!(path = %self.path.display(), "record store committed");
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Tables) -> Result<T, E>,
        E: From<StoreError>,
    {
        let lock = self.lock_file()?;
        FileExt::lock_exclusive(&lock).map_err(StoreError::from)?;
        let mut tables = self.load()?;
        match f(&mut tables) {
            Ok(value) => {
                self.persist(&tables)?;
                Ok(value)
            }
            Err(err) => {
                debug!(path = %self.path.display(), "transaction rolled back");
                Err(err)
            }
        }
    }

    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Tables) -> Result<T, E>,
        E: From<StoreError>,
    {
        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock).map_err(StoreError::from)?;
        let tables = self.load()?;
        f(&tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use toeflow_core::{Actor, Document, FeeLineItem, NewDocument, ReviewableFields};

    use crate::Order;

    fn doc() -> Document {
        Document::new(
            NewDocument {
                title: "Survey".into(),
                client_name: "Acme".into(),
                fields: ReviewableFields {
                    scope_of_work: "Survey the site.".into(),
                    fee_structure: vec![FeeLineItem::new("Survey", 250.0)],
                    ..ReviewableFields::default()
                },
            },
            &Actor::new("a@firm.example", "A"),
            Utc::now(),
            0.15,
        )
    }

    #[test]
    fn open_missing_file_starts_empty_without_creating() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        assert!(!path.exists());
        assert!(store.list_documents(Order::CreatedAsc).unwrap().is_empty());
    }

    #[test]
    fn commit_and_reopen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        let created = store.create_document(doc()).unwrap();
        assert!(path.exists());
        drop(store);

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get_document(&created.id).unwrap(), created);
    }

    #[test]
    fn rolled_back_transaction_leaves_file_untouched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.create_document(doc()).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let result: Result<(), StoreError> = store.transaction(|t| {
            t.create_document(doc())?;
            Err(StoreError::Other("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(store.list_documents(Order::CreatedAsc).unwrap().len(), 1);
    }

    #[test]
    fn handles_on_one_path_see_each_others_commits() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let first = JsonFileStore::open(&path).unwrap();
        let second = JsonFileStore::open(&path).unwrap();

        let a = first.create_document(doc()).unwrap();
        let b = second.create_document(doc()).unwrap();

        assert_eq!(first.get_document(&b.id).unwrap(), b);
        assert_eq!(second.get_document(&a.id).unwrap(), a);
        assert_eq!(first.list_documents(Order::CreatedAsc).unwrap().len(), 2);
        assert!(tmp.path().join("store.json.lock").exists());
    }

    #[test]
    fn concurrent_handles_do_not_lose_commits() {
        use std::thread;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let path = path.clone();
                thread::spawn(move || {
                    let store = JsonFileStore::open(&path).unwrap();
                    for _ in 0..3 {
                        store.create_document(doc()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.list_documents(Order::CreatedAsc).unwrap().len(), 18);
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Json(_))));
    }
}
