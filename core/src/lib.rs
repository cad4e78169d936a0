//! Core library for the realtime task list
//!
//! This crate contains the core logic, including:
//! - Task model and document schema
//! - Remote document store contract
//! - Task synchronization against a live collection

pub mod error;
pub mod store;
pub mod sync;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
