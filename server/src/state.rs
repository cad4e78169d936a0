//! Application state

use std::sync::Arc;

use tasklist_core::store::{CollectionRef, DocumentStore};
use tasklist_core::sync::{TaskListReader, TaskSynchronizer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    synchronizer: TaskSynchronizer,
    /// Port browsers use for the Socket.IO push channel
    socket_port: u16,
}

impl AppState {
    /// Create a new AppState watching `collection` on `store`
    pub fn new(store: Arc<dyn DocumentStore>, collection: CollectionRef, socket_port: u16) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                synchronizer: TaskSynchronizer::new(store, collection),
                socket_port,
            }),
        }
    }

    /// Get reference to the task synchronizer
    pub fn synchronizer(&self) -> &TaskSynchronizer {
        &self.inner.synchronizer
    }

    /// Read-only handle on the rendered task list
    pub fn tasks(&self) -> TaskListReader {
        self.inner.synchronizer.tasks()
    }

    pub fn socket_port(&self) -> u16 {
        self.inner.socket_port
    }
}
