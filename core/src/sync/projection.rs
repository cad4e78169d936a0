//! Local task list projected from snapshots
//!
//! The list has exactly one writer, held by the snapshot handler. Readers
//! observe it through a `watch` channel and never mutate it.

use tokio::sync::watch;
use tracing::warn;

use crate::store::Snapshot;
use crate::task::Task;
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
struct Projection {
    tasks: Vec<Task>,
    /// Number of snapshots applied so far
    generation: u64,
}

/// Map a snapshot to the task list it describes, keeping snapshot order
///
/// Documents that do not decode as tasks are left out.
pub fn project(snapshot: &Snapshot) -> Vec<Task> {
    snapshot
        .documents
        .iter()
        .filter_map(|document| match Task::from_document(document) {
            Ok(task) => Some(task),
            Err(e) => {
                warn!(
                    "Skipping malformed document {}/{}: {}",
                    snapshot.collection, document.id, e
                );
                None
            }
        })
        .collect()
}

/// Create the list cell: one writer, any number of readers
pub(crate) fn task_list() -> (TaskListWriter, TaskListReader) {
    let (tx, rx) = watch::channel(Projection::default());
    (TaskListWriter { tx }, TaskListReader { rx })
}

/// Sole write access to the local task list
#[derive(Debug)]
pub struct TaskListWriter {
    tx: watch::Sender<Projection>,
}

impl TaskListWriter {
    /// Replace the whole list with the projection of `snapshot`
    pub fn apply(&mut self, snapshot: &Snapshot) {
        let tasks = project(snapshot);
        self.tx.send_modify(|projection| {
            projection.tasks = tasks;
            projection.generation += 1;
        });
    }
}

/// Read-only view of the local task list
#[derive(Debug, Clone)]
pub struct TaskListReader {
    rx: watch::Receiver<Projection>,
}

impl TaskListReader {
    /// Current tasks, in snapshot order
    pub fn tasks(&self) -> Vec<Task> {
        self.rx.borrow().tasks.clone()
    }

    /// Number of snapshots applied so far
    pub fn generation(&self) -> u64 {
        self.rx.borrow().generation
    }

    /// Wait until a snapshot newer than the last one seen is applied
    pub async fn changed(&mut self) -> Result<()> {
        self.rx
            .changed()
            .await
            .map_err(|_| Error::SubscriptionClosed)
    }

    /// Wait until at least `generation` snapshots have been applied
    pub async fn wait_for_generation(&mut self, generation: u64) -> Result<Vec<Task>> {
        let projection = self
            .rx
            .wait_for(|p| p.generation >= generation)
            .await
            .map_err(|_| Error::SubscriptionClosed)?;
        Ok(projection.tasks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CollectionRef, Document};
    use chrono::Utc;
    use serde_json::{json, Value};

    fn snapshot(docs: Value) -> Snapshot {
        let now = Utc::now();
        let documents = docs
            .as_array()
            .unwrap()
            .iter()
            .map(|doc| {
                let mut fields = doc.as_object().cloned().unwrap();
                let id = fields.remove("id").unwrap();
                Document {
                    id: id.as_str().unwrap().to_string(),
                    fields,
                    create_time: now,
                    update_time: now,
                }
            })
            .collect();
        Snapshot::new(CollectionRef::new("tasks"), documents)
    }

    fn task(id: &str, title: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            completed,
        }
    }

    #[test]
    fn test_project_preserves_snapshot_order() {
        let tasks = project(&snapshot(json!([
            {"id": "b", "title": "second", "completed": true},
            {"id": "a", "title": "first", "completed": false},
        ])));

        assert_eq!(
            tasks,
            vec![task("b", "second", true), task("a", "first", false)]
        );
    }

    #[test]
    fn test_project_skips_malformed_documents() {
        let tasks = project(&snapshot(json!([
            {"id": "a", "title": "ok", "completed": false},
            {"id": "b", "completed": true},
            {"id": "c", "title": 42},
        ])));

        assert_eq!(tasks, vec![task("a", "ok", false)]);
    }

    #[test]
    fn test_apply_replaces_wholesale() {
        let (mut writer, reader) = task_list();
        assert!(reader.tasks().is_empty());
        assert_eq!(reader.generation(), 0);

        writer.apply(&snapshot(json!([
            {"id": "a", "title": "one", "completed": false},
            {"id": "b", "title": "two", "completed": false},
        ])));
        writer.apply(&snapshot(json!([
            {"id": "c", "title": "three", "completed": true},
        ])));

        assert_eq!(reader.tasks(), vec![task("c", "three", true)]);
        assert_eq!(reader.generation(), 2);
    }

    #[test]
    fn test_same_snapshot_applied_twice_is_stable() {
        let (mut writer, reader) = task_list();
        let snap = snapshot(json!([{"id": "a", "title": "one", "completed": false}]));

        writer.apply(&snap);
        let first = reader.tasks();
        writer.apply(&snap);

        assert_eq!(reader.tasks(), first);
        assert_eq!(reader.tasks(), project(&snap));
    }

    #[tokio::test]
    async fn test_reader_closed_after_writer_dropped() {
        let (writer, mut reader) = task_list();
        drop(writer);

        match reader.changed().await.unwrap_err() {
            Error::SubscriptionClosed => {}
            e => panic!("Expected SubscriptionClosed error, got: {:?}", e),
        }
    }
}
