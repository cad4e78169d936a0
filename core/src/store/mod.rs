//! Remote document store contract
//!
//! A managed document database seen as named collections of documents,
//! with push-based watches and asynchronous create/update/delete.

mod document;
mod local;
mod stream;

pub use document::*;
pub use local::LocalDocumentStore;
pub use stream::SnapshotStream;

use async_trait::async_trait;

use crate::Result;

/// Interface to a realtime document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Register a push listener on a collection
    ///
    /// The returned stream yields the current snapshot first, then a full
    /// snapshot after every change. Dropping it releases the watch.
    async fn watch(&self, collection: &CollectionRef) -> Result<SnapshotStream>;

    /// Insert a new document; the store assigns its identifier
    async fn create(&self, collection: &CollectionRef, fields: Fields) -> Result<DocumentRef>;

    /// Merge fields into an existing document
    async fn update(&self, document: &DocumentRef, fields: Fields) -> Result<()>;

    /// Remove a document
    async fn delete(&self, document: &DocumentRef) -> Result<()>;
}
