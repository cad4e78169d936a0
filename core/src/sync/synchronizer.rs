//! Task synchronizer
//!
//! Owns the watch on the task collection and the local list fed by it.
//! User intents only ever reach the store; the list changes when the store
//! pushes the next snapshot.

use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::projection::{task_list, TaskListReader, TaskListWriter};
use crate::store::{CollectionRef, DocumentStore, SnapshotStream};
use crate::task::{TaskFields, TitleDraft};
use crate::{Error, Result};

/// Lifecycle of the collection watch
enum WatchState {
    /// Initial state; holds the list writer until a handler takes it
    Unsubscribed(TaskListWriter),
    Subscribed(Subscription),
    /// Terminal state after release
    Released,
}

/// A running snapshot handler
struct Subscription {
    cancel: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn the handler that applies each snapshot in turn
    fn start(
        mut stream: SnapshotStream,
        mut writer: TaskListWriter,
        collection: CollectionRef,
    ) -> Self {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => break,
                    next = stream.next() => match next {
                        Some(snapshot) => {
                            debug!("Snapshot of {} with {} documents", collection, snapshot.len());
                            writer.apply(&snapshot);
                        }
                        None => {
                            warn!("Watch on {} ended by the store", collection);
                            break;
                        }
                    },
                }
            }
            stream.close();
        });

        Self {
            cancel: Some(cancel_tx),
            handle: Some(handle),
        }
    }

    /// Stop the handler and wait for it to drop the stream
    async fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Keeps a local task list consistent with a remote collection
///
/// Mutations return `Result` so callers can decide; the display layer
/// ignores failures and waits for the next snapshot instead.
pub struct TaskSynchronizer {
    store: Arc<dyn DocumentStore>,
    collection: CollectionRef,
    tasks: TaskListReader,
    state: Mutex<WatchState>,
}

impl TaskSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>, collection: CollectionRef) -> Self {
        let (writer, tasks) = task_list();
        Self {
            store,
            collection,
            tasks,
            state: Mutex::new(WatchState::Unsubscribed(writer)),
        }
    }

    /// The watched collection
    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    /// Read-only handle on the local task list
    pub fn tasks(&self) -> TaskListReader {
        self.tasks.clone()
    }

    pub async fn is_subscribed(&self) -> bool {
        matches!(*self.state.lock().await, WatchState::Subscribed(_))
    }

    /// Start watching the collection
    ///
    /// Can succeed once; after `unsubscribe` the synchronizer stays released.
    pub async fn subscribe(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, WatchState::Released) {
            WatchState::Unsubscribed(writer) => match self.store.watch(&self.collection).await {
                Ok(stream) => {
                    *state = WatchState::Subscribed(Subscription::start(
                        stream,
                        writer,
                        self.collection.clone(),
                    ));
                    info!("Subscribed to {}", self.collection);
                    Ok(())
                }
                Err(e) => {
                    *state = WatchState::Unsubscribed(writer);
                    Err(e)
                }
            },
            subscribed @ WatchState::Subscribed(_) => {
                *state = subscribed;
                Err(Error::AlreadySubscribed)
            }
            WatchState::Released => Err(Error::SubscriptionClosed),
        }
    }

    /// Release the watch; returns false if there was nothing to release
    pub async fn unsubscribe(&self) -> bool {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, WatchState::Released) {
            WatchState::Subscribed(subscription) => {
                subscription.cancel().await;
                info!("Unsubscribed from {}", self.collection);
                true
            }
            other => {
                *state = other;
                false
            }
        }
    }

    /// Create a task from user input
    ///
    /// Blank input is ignored and returns `Ok(None)` without contacting the
    /// store. Otherwise returns the store-assigned id. The task shows up in
    /// the local list with the next snapshot.
    pub async fn add_task(&self, title: &str) -> Result<Option<String>> {
        let title = title.trim();
        if title.is_empty() {
            debug!("Ignoring blank task title");
            return Ok(None);
        }

        let created = self
            .store
            .create(&self.collection, TaskFields::new(title).into_fields())
            .await?;
        info!("Created task {}", created.id);
        Ok(Some(created.id))
    }

    /// Submit the staged title, clearing it only once the create succeeded
    pub async fn submit(&self, draft: &mut TitleDraft) -> Result<Option<String>> {
        let created = self.add_task(draft.as_str()).await?;
        if created.is_some() {
            draft.clear();
        }
        Ok(created)
    }

    /// Flip the completion flag of a task
    pub async fn toggle_task(&self, id: &str, current_completed: bool) -> Result<()> {
        self.store
            .update(
                &self.collection.doc(id),
                TaskFields::toggle_patch(current_completed),
            )
            .await?;
        info!("Toggled task {} to completed={}", id, !current_completed);
        Ok(())
    }

    /// Delete a task
    pub async fn delete_task(&self, id: &str) -> Result<()> {
        self.store.delete(&self.collection.doc(id)).await?;
        info!("Deleted task {}", id);
        Ok(())
    }
}
