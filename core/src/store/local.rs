//! In-process document store
//!
//! Keeps collections in memory, optionally mirrored to a JSON file, and
//! pushes a full snapshot to every live watcher after each change.

use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use super::document::{CollectionRef, Document, DocumentRef, Fields, Snapshot};
use super::stream::SnapshotStream;
use super::DocumentStore;
use crate::{Error, Result};

/// Length of store-assigned document identifiers
const AUTO_ID_LEN: usize = 20;

#[derive(Default)]
struct CollectionState {
    /// Documents in insertion order
    documents: Vec<Document>,
    watchers: Vec<mpsc::UnboundedSender<Snapshot>>,
}

impl CollectionState {
    fn snapshot(&self, collection: &CollectionRef) -> Snapshot {
        Snapshot::new(collection.clone(), self.documents.clone())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.id == id)
    }

    /// Push the current snapshot to every watcher, dropping closed ones
    fn notify(&mut self, collection: &CollectionRef) {
        let snapshot = self.snapshot(collection);
        self.watchers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        debug!(
            "Notified {} watcher(s) of {} ({} documents)",
            self.watchers.len(),
            collection,
            snapshot.len()
        );
    }

    fn next_id(&self) -> String {
        loop {
            let id: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(AUTO_ID_LEN)
                .map(char::from)
                .collect();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }
}

/// Document store living in this process
pub struct LocalDocumentStore {
    /// Path to the JSON file, if the store is durable
    path: Option<PathBuf>,
    collections: RwLock<HashMap<CollectionRef, CollectionState>>,
}

impl Default for LocalDocumentStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl LocalDocumentStore {
    /// Create a store that keeps nothing across restarts
    pub fn in_memory() -> Self {
        Self {
            path: None,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Open a store backed by a JSON file
    ///
    /// If the file doesn't exist, it will be created on first write.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let collections = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            let stored: BTreeMap<String, Vec<Document>> = serde_json::from_str(&content)?;
            stored
                .into_iter()
                .map(|(name, documents)| {
                    (
                        CollectionRef::new(name),
                        CollectionState {
                            documents,
                            watchers: Vec::new(),
                        },
                    )
                })
                .collect()
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: Some(path),
            collections: RwLock::new(collections),
        })
    }

    /// Persist all collections to disk
    ///
    /// Called with the write lock held so the file matches what watchers see.
    async fn persist(&self, collections: &HashMap<CollectionRef, CollectionState>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let stored: BTreeMap<&str, &Vec<Document>> = collections
            .iter()
            .map(|(collection, state)| (collection.name(), &state.documents))
            .collect();
        let content = serde_json::to_string_pretty(&stored)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(path, content).await.map_err(|e| {
            Error::Storage(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn watch(&self, collection: &CollectionRef) -> Result<SnapshotStream> {
        let (tx, stream) = SnapshotStream::channel();
        let mut collections = self.collections.write().await;
        let state = collections.entry(collection.clone()).or_default();

        // Every watch starts with the current contents
        tx.send(state.snapshot(collection))
            .map_err(|_| Error::Unavailable(format!("watch on {} closed", collection)))?;
        state.watchers.push(tx);

        debug!("Watching {} ({} watchers)", collection, state.watchers.len());
        Ok(stream)
    }

    async fn create(&self, collection: &CollectionRef, fields: Fields) -> Result<DocumentRef> {
        let mut collections = self.collections.write().await;
        let state = collections.entry(collection.clone()).or_default();
        let id = state.next_id();
        let now = Utc::now();
        state.documents.push(Document {
            id: id.clone(),
            fields,
            create_time: now,
            update_time: now,
        });

        let persisted = self.persist(&collections).await;
        let Some(state) = collections.get_mut(collection) else {
            return Err(Error::Storage(format!("collection {} vanished", collection)));
        };
        if let Err(e) = persisted {
            state.documents.pop();
            return Err(e);
        }
        state.notify(collection);

        debug!("Created {}/{}", collection, id);
        Ok(collection.doc(id))
    }

    async fn update(&self, document: &DocumentRef, fields: Fields) -> Result<()> {
        let mut collections = self.collections.write().await;
        let state = collections
            .get_mut(&document.collection)
            .ok_or_else(|| Error::DocumentNotFound(document.to_string()))?;
        let index = state
            .position(&document.id)
            .ok_or_else(|| Error::DocumentNotFound(document.to_string()))?;

        let stored = &mut state.documents[index];
        let previous = stored.clone();
        stored.fields.extend(fields);
        stored.update_time = Utc::now();

        let persisted = self.persist(&collections).await;
        let Some(state) = collections.get_mut(&document.collection) else {
            return Err(Error::DocumentNotFound(document.to_string()));
        };
        if let Err(e) = persisted {
            state.documents[index] = previous;
            return Err(e);
        }
        state.notify(&document.collection);

        debug!("Updated {}", document);
        Ok(())
    }

    async fn delete(&self, document: &DocumentRef) -> Result<()> {
        let mut collections = self.collections.write().await;
        let Some(state) = collections.get_mut(&document.collection) else {
            return Ok(());
        };
        let Some(index) = state.position(&document.id) else {
            return Ok(());
        };
        let removed = state.documents.remove(index);

        let persisted = self.persist(&collections).await;
        let Some(state) = collections.get_mut(&document.collection) else {
            return Ok(());
        };
        if let Err(e) = persisted {
            state.documents.insert(index, removed);
            return Err(e);
        }
        state.notify(&document.collection);

        debug!("Deleted {}", document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tempfile::TempDir;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn tasks() -> CollectionRef {
        CollectionRef::new("tasks")
    }

    #[tokio::test]
    async fn test_watch_starts_with_current_snapshot() {
        let store = LocalDocumentStore::in_memory();
        store
            .create(&tasks(), fields(json!({"title": "a"})))
            .await
            .unwrap();

        let mut stream = store.watch(&tasks()).await.unwrap();
        let snapshot = stream.next().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.documents[0].fields["title"], "a");
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_notifies() {
        let store = LocalDocumentStore::in_memory();
        let mut stream = store.watch(&tasks()).await.unwrap();
        assert!(stream.next().await.unwrap().is_empty());

        let created = store
            .create(&tasks(), fields(json!({"title": "a", "completed": false})))
            .await
            .unwrap();
        assert_eq!(created.id.len(), AUTO_ID_LEN);
        assert!(created.id.chars().all(|c| c.is_ascii_alphanumeric()));

        let snapshot = stream.next().await.unwrap();
        assert_eq!(snapshot.documents[0].id, created.id);
    }

    #[tokio::test]
    async fn test_snapshots_keep_insertion_order() {
        let store = LocalDocumentStore::in_memory();
        for title in ["first", "second", "third"] {
            store
                .create(&tasks(), fields(json!({ "title": title })))
                .await
                .unwrap();
        }

        let mut stream = store.watch(&tasks()).await.unwrap();
        let titles: Vec<Value> = stream
            .next()
            .await
            .unwrap()
            .documents
            .into_iter()
            .map(|d| d.fields["title"].clone())
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = LocalDocumentStore::in_memory();
        let doc = store
            .create(&tasks(), fields(json!({"title": "a", "completed": false})))
            .await
            .unwrap();

        store
            .update(&doc, fields(json!({"completed": true})))
            .await
            .unwrap();

        let mut stream = store.watch(&tasks()).await.unwrap();
        let snapshot = stream.next().await.unwrap();
        assert_eq!(
            Value::Object(snapshot.documents[0].fields.clone()),
            json!({"title": "a", "completed": true})
        );
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = LocalDocumentStore::in_memory();
        let result = store
            .update(&tasks().doc("missing"), fields(json!({"completed": true})))
            .await;

        match result.unwrap_err() {
            Error::DocumentNotFound(path) => assert_eq!(path, "tasks/missing"),
            e => panic!("Expected DocumentNotFound error, got: {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_delete_removes_and_notifies() {
        let store = LocalDocumentStore::in_memory();
        let doc = store
            .create(&tasks(), fields(json!({"title": "a"})))
            .await
            .unwrap();
        let mut stream = store.watch(&tasks()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().len(), 1);

        store.delete(&doc).await.unwrap();
        assert!(stream.next().await.unwrap().is_empty());

        // Deleting again is a silent no-op
        store.delete(&doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_watchers_are_pruned() {
        let store = LocalDocumentStore::in_memory();
        let stream = store.watch(&tasks()).await.unwrap();
        drop(stream);

        store
            .create(&tasks(), fields(json!({"title": "a"})))
            .await
            .unwrap();

        let collections = store.collections.read().await;
        assert!(collections[&tasks()].watchers.is_empty());
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = LocalDocumentStore::in_memory();
        let mut other = store.watch(&CollectionRef::new("notes")).await.unwrap();
        assert!(other.next().await.unwrap().is_empty());

        store
            .create(&tasks(), fields(json!({"title": "a"})))
            .await
            .unwrap();

        let collections = store.collections.read().await;
        assert!(collections[&CollectionRef::new("notes")].documents.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let doc;
        {
            let store = LocalDocumentStore::open(&path).await.unwrap();
            doc = store
                .create(&tasks(), fields(json!({"title": "Persistent", "completed": false})))
                .await
                .unwrap();
            store
                .update(&doc, fields(json!({"completed": true})))
                .await
                .unwrap();
        }

        {
            let store = LocalDocumentStore::open(&path).await.unwrap();
            let mut stream = store.watch(&tasks()).await.unwrap();
            let snapshot = stream.next().await.unwrap();
            assert_eq!(snapshot.len(), 1);
            assert_eq!(snapshot.documents[0].id, doc.id);
            assert_eq!(snapshot.documents[0].fields["completed"], true);
        }
    }

    /// Watcher must not have anything queued beyond what was already drained
    async fn assert_no_snapshot(stream: &mut SnapshotStream) {
        let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err(), "unexpected snapshot: {:?}", pending);
    }

    #[tokio::test]
    async fn test_failed_persist_does_not_commit_create() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let store = LocalDocumentStore::open(blocker.join("store.json")).await.unwrap();
        let mut stream = store.watch(&tasks()).await.unwrap();
        assert!(stream.next().await.unwrap().is_empty());

        let result = store
            .create(&tasks(), fields(json!({"title": "a", "completed": false})))
            .await;
        assert!(result.is_err());

        assert_no_snapshot(&mut stream).await;
        let collections = store.collections.read().await;
        assert!(collections[&tasks()].documents.is_empty());
    }

    #[tokio::test]
    async fn test_failed_persist_rolls_back_update_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");

        let store = LocalDocumentStore::open(&path).await.unwrap();
        let doc = store
            .create(&tasks(), fields(json!({"title": "a", "completed": false})))
            .await
            .unwrap();
        let mut stream = store.watch(&tasks()).await.unwrap();
        let before = stream.next().await.unwrap().documents;

        // Writes now fail: the data file path is a directory
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store
            .update(&doc, fields(json!({"completed": true})))
            .await
            .is_err());
        assert!(store.delete(&doc).await.is_err());

        assert_no_snapshot(&mut stream).await;
        let collections = store.collections.read().await;
        assert_eq!(collections[&tasks()].documents, before);
    }
}
