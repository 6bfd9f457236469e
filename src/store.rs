//! Durable document store.
//!
//! Holds every document in memory and mirrors the full state through a
//! [`StateSink`] synchronously on every mutation, so a crash right after
//! a successful `put` or history append never loses it. When a flush
//! fails, the in-memory mutation is rolled back so memory and disk are
//! never allowed to silently diverge.
//!
//! Startup loads the previous state; a missing or unparsable durable
//! file is logged and treated as an empty store, never a crash.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::QaError;
use crate::models::{Document, DocumentSummary, HistoryEntry};

/// Byte-oriented durable target for the serialized store.
///
/// The file implementation is the production backend; tests substitute
/// in-memory or failing sinks. Whatever the backend, `write` then `read`
/// must round-trip the bytes.
pub trait StateSink: Send + Sync {
    /// Read the previously written state, or `None` if nothing exists yet.
    fn read(&self) -> Result<Option<Vec<u8>>, QaError>;
    /// Durably replace the stored state.
    fn write(&self, bytes: &[u8]) -> Result<(), QaError>;
}

/// [`StateSink`] backed by a single file, rewritten whole on each flush.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl StateSink for FileSink {
    fn read(&self) -> Result<Option<Vec<u8>>, QaError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QaError::Persistence(format!(
                "read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    // Write to a sibling temp file, sync, then rename over the target.
    // A crash mid-rewrite leaves the previous state file untouched.
    fn write(&self, bytes: &[u8]) -> Result<(), QaError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    QaError::Persistence(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }

        let tmp_path = self.temp_path();
        let write_err =
            |e: std::io::Error| QaError::Persistence(format!("write {}: {}", tmp_path.display(), e));

        let mut file = std::fs::File::create(&tmp_path).map_err(write_err)?;
        file.write_all(bytes).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path).map_err(|e| {
            QaError::Persistence(format!(
                "rename {} to {}: {}",
                tmp_path.display(),
                self.path.display(),
                e
            ))
        })
    }
}

/// Serialized form of the whole store. `order` preserves insertion order
/// for listing; `documents` is the id lookup.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    order: Vec<String>,
    documents: HashMap<String, Document>,
}

/// In-process document store with flush-on-mutation persistence.
///
/// One coarse mutex serializes every read-modify-write-persist sequence,
/// so two concurrent history appends cannot overwrite each other's
/// durable write.
pub struct DocumentStore {
    state: Mutex<StoreState>,
    sink: Box<dyn StateSink>,
}

impl DocumentStore {
    /// Open a store over `sink`, rehydrating any previous state.
    pub fn open(sink: Box<dyn StateSink>) -> Result<Self, QaError> {
        let state = match sink.read()? {
            Some(bytes) => match serde_json::from_slice::<StoreState>(&bytes) {
                Ok(state) => {
                    tracing::info!(documents = state.order.len(), "loaded durable store");
                    state
                }
                Err(e) => {
                    tracing::warn!("durable store is unreadable, starting empty: {}", e);
                    StoreState::default()
                }
            },
            None => StoreState::default(),
        };
        Ok(Self {
            state: Mutex::new(state),
            sink,
        })
    }

    /// Open a store persisted to a single file at `path`.
    pub fn open_file(path: &Path) -> Result<Self, QaError> {
        Self::open(Box::new(FileSink::new(path)))
    }

    /// Insert a new document.
    ///
    /// # Errors
    ///
    /// `DuplicateId` when the id already exists (ids come from a
    /// monotonically-increasing source, so a collision is a caller bug);
    /// `Persistence` when the durable write fails, in which case the
    /// document is not kept in memory either.
    pub fn put(&self, document: Document) -> Result<(), QaError> {
        let mut state = self.state.lock().unwrap();
        if state.documents.contains_key(&document.id) {
            return Err(QaError::DuplicateId(document.id));
        }

        let id = document.id.clone();
        state.order.push(id.clone());
        state.documents.insert(id.clone(), document);

        if let Err(e) = self.flush(&state) {
            state.order.pop();
            state.documents.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    /// Fetch a document by id.
    pub fn get(&self, id: &str) -> Result<Document, QaError> {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| QaError::NotFound(id.to_string()))
    }

    /// Summaries of all documents, in insertion order.
    pub fn list(&self) -> Vec<DocumentSummary> {
        let state = self.state.lock().unwrap();
        state
            .order
            .iter()
            .filter_map(|id| state.documents.get(id))
            .map(|doc| DocumentSummary {
                id: doc.id.clone(),
                filename: doc.filename.clone(),
                chunk_count: doc.chunks.len(),
                history_count: doc.history.len(),
                created_at: doc.created_at,
            })
            .collect()
    }

    /// Append one question/answer exchange to a document's history.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id; `Persistence` when the durable write
    /// fails, in which case the entry is removed from memory again.
    pub fn append_history(&self, id: &str, entry: HistoryEntry) -> Result<(), QaError> {
        let mut state = self.state.lock().unwrap();
        match state.documents.get_mut(id) {
            Some(doc) => doc.history.push(entry),
            None => return Err(QaError::NotFound(id.to_string())),
        }

        if let Err(e) = self.flush(&state) {
            if let Some(doc) = state.documents.get_mut(id) {
                doc.history.pop();
            }
            return Err(e);
        }
        Ok(())
    }

    fn flush(&self, state: &StoreState) -> Result<(), QaError> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| QaError::Persistence(format!("serialize store: {}", e)))?;
        self.sink.write(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn doc(id: &str, filename: &str) -> Document {
        Document {
            id: id.to_string(),
            filename: filename.to_string(),
            chunks: vec![
                Chunk {
                    text: "alpha".to_string(),
                    embedding: vec![1.0, 0.0],
                },
                Chunk {
                    text: "beta".to_string(),
                    embedding: vec![0.0, 1.0],
                },
            ],
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn entry(q: &str, a: &str) -> HistoryEntry {
        HistoryEntry {
            question: q.to_string(),
            answer: a.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Sink that can be flipped to fail every write.
    struct FlakySink {
        inner: FileSink,
        fail: Arc<AtomicBool>,
    }

    impl StateSink for FlakySink {
        fn read(&self) -> Result<Option<Vec<u8>>, QaError> {
            self.inner.read()
        }
        fn write(&self, bytes: &[u8]) -> Result<(), QaError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(QaError::Persistence("disk full".to_string()));
            }
            self.inner.write(bytes)
        }
    }

    #[test]
    fn put_get_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open_file(&tmp.path().join("store.json")).unwrap();
        store.put(doc("d1", "a.txt")).unwrap();

        let got = store.get("d1").unwrap();
        assert_eq!(got.filename, "a.txt");
        assert_eq!(got.chunks.len(), 2);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open_file(&tmp.path().join("store.json")).unwrap();
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, QaError::NotFound(_)));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open_file(&tmp.path().join("store.json")).unwrap();
        store.put(doc("d1", "a.txt")).unwrap();
        let err = store.put(doc("d1", "b.txt")).unwrap_err();
        assert!(matches!(err, QaError::DuplicateId(_)));
        // First document untouched.
        assert_eq!(store.get("d1").unwrap().filename, "a.txt");
    }

    #[test]
    fn list_preserves_insertion_order() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open_file(&tmp.path().join("store.json")).unwrap();
        store.put(doc("d2", "second.txt")).unwrap();
        store.put(doc("d1", "first.txt")).unwrap();
        store.put(doc("d3", "third.txt")).unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["d2", "d1", "d3"]);
    }

    #[test]
    fn append_history_mutates_and_counts() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open_file(&tmp.path().join("store.json")).unwrap();
        store.put(doc("d1", "a.txt")).unwrap();
        store.append_history("d1", entry("q1", "a1")).unwrap();
        store.append_history("d1", entry("q2", "a2")).unwrap();

        let got = store.get("d1").unwrap();
        assert_eq!(got.history.len(), 2);
        assert_eq!(got.history[0].question, "q1");
        assert_eq!(store.list()[0].history_count, 2);

        let err = store.append_history("nope", entry("q", "a")).unwrap_err();
        assert!(matches!(err, QaError::NotFound(_)));
    }

    #[test]
    fn durable_state_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        {
            let store = DocumentStore::open_file(&path).unwrap();
            store.put(doc("d1", "a.txt")).unwrap();
            store.append_history("d1", entry("q1", "a1")).unwrap();
        }

        let reopened = DocumentStore::open_file(&path).unwrap();
        let got = reopened.get("d1").unwrap();
        assert_eq!(got.chunks[0].text, "alpha");
        assert_eq!(got.chunks[0].embedding, vec![1.0, 0.0]);
        assert_eq!(got.history[0].answer, "a1");
        assert_eq!(reopened.list().len(), 1);
    }

    #[test]
    fn corrupt_durable_file_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = DocumentStore::open_file(&path).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn interrupted_rewrite_leaves_committed_state_readable() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        {
            let store = DocumentStore::open_file(&path).unwrap();
            store.put(doc("d1", "a.txt")).unwrap();
        }

        // A crash mid-rewrite leaves a half-written temp file behind;
        // the committed state file must be untouched by it.
        let committed = std::fs::read(&path).unwrap();
        let half = &committed[..committed.len() / 2];
        std::fs::write(tmp.path().join("store.json.tmp"), half).unwrap();

        let reopened = DocumentStore::open_file(&path).unwrap();
        assert!(reopened.get("d1").is_ok());
        assert_eq!(reopened.list().len(), 1);
    }

    #[test]
    fn successful_flush_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let store = DocumentStore::open_file(&path).unwrap();
        store.put(doc("d1", "a.txt")).unwrap();
        store.append_history("d1", entry("q", "a")).unwrap();

        assert!(path.exists());
        assert!(!tmp.path().join("store.json.tmp").exists());
    }

    #[test]
    fn failed_flush_rolls_back_put() {
        let tmp = TempDir::new().unwrap();
        let fail = Arc::new(AtomicBool::new(true));
        let sink = FlakySink {
            inner: FileSink::new(tmp.path().join("store.json")),
            fail: fail.clone(),
        };
        let store = DocumentStore::open(Box::new(sink)).unwrap();

        let err = store.put(doc("d1", "a.txt")).unwrap_err();
        assert!(matches!(err, QaError::Persistence(_)));
        assert!(matches!(store.get("d1"), Err(QaError::NotFound(_))));
        assert!(store.list().is_empty());
    }

    #[test]
    fn failed_flush_rolls_back_history_append() {
        let tmp = TempDir::new().unwrap();
        let fail = Arc::new(AtomicBool::new(false));
        let sink = FlakySink {
            inner: FileSink::new(tmp.path().join("store.json")),
            fail: fail.clone(),
        };
        let store = DocumentStore::open(Box::new(sink)).unwrap();
        store.put(doc("d1", "a.txt")).unwrap();

        fail.store(true, Ordering::SeqCst);
        let err = store.append_history("d1", entry("q", "a")).unwrap_err();
        assert!(matches!(err, QaError::Persistence(_)));
        assert!(store.get("d1").unwrap().history.is_empty());
    }
}
