//! Task synchronization
//!
//! Mirrors a watched task collection into a locally owned list and turns
//! user intents into store mutations.

mod projection;
mod synchronizer;

pub use projection::{project, TaskListReader, TaskListWriter};
pub use synchronizer::TaskSynchronizer;
