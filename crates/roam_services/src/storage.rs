//! Document storage
//!
//! Whole documents addressed by `(collection, key)`. Every write names the
//! revision it was based on; a mismatch is a [`StorageError::Conflict`] and
//! nothing is written.

use crate::error::{StorageError, StorageResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const WORLDS: &str = "worlds";
pub const PLAYERS: &str = "players";

/// A document together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub revision: u64,
    pub value: T,
}

pub trait DocumentStore: Send + Sync {
    fn load(&self, collection: &str, key: &str) -> StorageResult<Option<Versioned<Value>>>;

    /// Write `value` if the stored revision is `expected` (`None` meaning
    /// the document must not exist yet). Returns the new revision.
    fn store(
        &self,
        collection: &str,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> StorageResult<u64>;

    /// Returns whether a document was removed.
    fn remove(&self, collection: &str, key: &str) -> StorageResult<bool>;
}

/// Load and deserialize a document.
pub fn load_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
) -> StorageResult<Option<Versioned<T>>> {
    let Some(Versioned { revision, value }) = store.load(collection, key)? else {
        return Ok(None);
    };
    let value = serde_json::from_value(value).map_err(|source| StorageError::Corrupt {
        collection: collection.to_string(),
        key: key.to_string(),
        source,
    })?;
    Ok(Some(Versioned { revision, value }))
}

/// Serialize and store a document.
pub fn store_as<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
    value: &T,
    expected: Option<u64>,
) -> StorageResult<u64> {
    let value = serde_json::to_value(value).map_err(|source| StorageError::Corrupt {
        collection: collection.to_string(),
        key: key.to_string(),
        source,
    })?;
    store.store(collection, key, value, expected)
}

/// Fail with a conflict unless the stored revision is still `expected`.
pub fn ensure_revision(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
    expected: Option<u64>,
) -> StorageResult<()> {
    let found = store.load(collection, key)?.map(|doc| doc.revision);
    if found != expected {
        return Err(conflict(collection, key, expected, found));
    }
    Ok(())
}

fn conflict(
    collection: &str,
    key: &str,
    expected: Option<u64>,
    found: Option<u64>,
) -> StorageError {
    tracing::warn!(collection, key, ?expected, ?found, "Revision conflict");
    StorageError::Conflict {
        collection: collection.to_string(),
        key: key.to_string(),
        expected,
        found,
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<(String, String), Versioned<Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, collection: &str, key: &str) -> StorageResult<Option<Versioned<Value>>> {
        let id = (collection.to_string(), key.to_string());
        Ok(self.documents.get(&id).map(|doc| doc.value().clone()))
    }

    fn store(
        &self,
        collection: &str,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> StorageResult<u64> {
        match self.documents.entry((collection.to_string(), key.to_string())) {
            Entry::Occupied(mut occupied) => {
                let found = occupied.get().revision;
                if expected != Some(found) {
                    return Err(conflict(collection, key, expected, Some(found)));
                }
                let revision = found + 1;
                occupied.insert(Versioned { revision, value });
                Ok(revision)
            }
            Entry::Vacant(vacant) => {
                if expected.is_some() {
                    return Err(conflict(collection, key, expected, None));
                }
                vacant.insert(Versioned { revision: 1, value });
                Ok(1)
            }
        }
    }

    fn remove(&self, collection: &str, key: &str) -> StorageResult<bool> {
        let id = (collection.to_string(), key.to_string());
        Ok(self.documents.remove(&id).is_some())
    }
}

/// One pretty-printed JSON file per document under
/// `<root>/<collection>/<key>.json`.
#[derive(Debug)]
pub struct JsonDirStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            path: root.clone(),
            source,
        })?;
        tracing::info!(root = %root.display(), "Opened document directory");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, collection: &str, key: &str) -> PathBuf {
        self.root
            .join(file_safe(collection))
            .join(format!("{}.json", file_safe(key)))
    }

    fn read(&self, collection: &str, key: &str) -> StorageResult<Option<Versioned<Value>>> {
        let path = self.path_for(collection, key);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                collection: collection.to_string(),
                key: key.to_string(),
                source,
            })
    }
}

impl DocumentStore for JsonDirStore {
    fn load(&self, collection: &str, key: &str) -> StorageResult<Option<Versioned<Value>>> {
        self.read(collection, key)
    }

    fn store(
        &self,
        collection: &str,
        key: &str,
        value: Value,
        expected: Option<u64>,
    ) -> StorageResult<u64> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let found = self.read(collection, key)?.map(|doc| doc.revision);
        if found != expected {
            return Err(conflict(collection, key, expected, found));
        }
        let revision = found.map_or(1, |revision| revision + 1);

        let path = self.path_for(collection, key);
        let io_error = |source| StorageError::Io {
            path: path.clone(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_error)?;
        }
        let document = Versioned { revision, value };
        let text = serde_json::to_string_pretty(&document).map_err(|source| StorageError::Corrupt {
            collection: collection.to_string(),
            key: key.to_string(),
            source,
        })?;

        // Write aside and rename so readers never see half a document.
        let staging = path.with_extension("json.tmp");
        std::fs::write(&staging, text).map_err(io_error)?;
        std::fs::rename(&staging, &path).map_err(io_error)?;
        Ok(revision)
    }

    fn remove(&self, collection: &str, key: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let path = self.path_for(collection, key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

/// Percent-encode anything outside `[A-Za-z0-9_-]`.
fn file_safe(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("roam-store-{nanos}"))
    }

    #[test]
    fn revision_check_writes_nothing() {
        let store = MemoryStore::new();
        assert!(ensure_revision(&store, PLAYERS, "p1", None).is_ok());
        assert!(matches!(
            ensure_revision(&store, PLAYERS, "p1", Some(1)),
            Err(StorageError::Conflict { found: None, .. })
        ));

        store.store(PLAYERS, "p1", json!({}), None).unwrap();
        assert!(ensure_revision(&store, PLAYERS, "p1", Some(1)).is_ok());
        assert!(matches!(
            ensure_revision(&store, PLAYERS, "p1", None),
            Err(StorageError::Conflict { found: Some(1), .. })
        ));
        assert_eq!(store.load(PLAYERS, "p1").unwrap().unwrap().revision, 1);
    }

    fn exercise(store: &dyn DocumentStore) {
        assert!(store.load(WORLDS, "p1").unwrap().is_none());

        assert_eq!(store.store(WORLDS, "p1", json!({ "n": 1 }), None).unwrap(), 1);
        assert!(matches!(
            store.store(WORLDS, "p1", json!({ "n": 9 }), None),
            Err(StorageError::Conflict { found: Some(1), .. })
        ));
        assert_eq!(store.store(WORLDS, "p1", json!({ "n": 2 }), Some(1)).unwrap(), 2);
        assert!(matches!(
            store.store(WORLDS, "p1", json!({ "n": 3 }), Some(1)),
            Err(StorageError::Conflict { expected: Some(1), found: Some(2), .. })
        ));

        let doc = store.load(WORLDS, "p1").unwrap().unwrap();
        assert_eq!(doc.revision, 2);
        assert_eq!(doc.value, json!({ "n": 2 }));

        assert!(store.load(PLAYERS, "p1").unwrap().is_none());
        assert!(store.remove(WORLDS, "p1").unwrap());
        assert!(!store.remove(WORLDS, "p1").unwrap());
        assert!(matches!(
            store.store(WORLDS, "p1", json!({}), Some(2)),
            Err(StorageError::Conflict { found: None, .. })
        ));
    }

    #[test]
    fn memory_store_compares_revisions() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn json_dir_store_compares_revisions() {
        let dir = scratch_dir();
        let store = JsonDirStore::open(&dir).unwrap();
        exercise(&store);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn json_dir_store_survives_reopen() {
        let dir = scratch_dir();
        {
            let store = JsonDirStore::open(&dir).unwrap();
            store_as(&store, PLAYERS, "user/with:odd chars", &json!([1, 2]), None).unwrap();
        }
        let store = JsonDirStore::open(&dir).unwrap();
        let doc: Versioned<Vec<u32>> = load_as(&store, PLAYERS, "user/with:odd chars")
            .unwrap()
            .unwrap();
        assert_eq!(doc.revision, 1);
        assert_eq!(doc.value, vec![1, 2]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn typed_load_reports_corrupt_documents() {
        let store = MemoryStore::new();
        store.store(PLAYERS, "p", json!("not a list"), None).unwrap();
        assert!(matches!(
            load_as::<Vec<u32>>(&store, PLAYERS, "p"),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn file_names_are_escaped() {
        assert_eq!(file_safe("abc-DEF_1"), "abc-DEF_1");
        assert_eq!(file_safe("a/b"), "a%2Fb");
        assert_eq!(file_safe(".."), "%2E%2E");
    }
}
