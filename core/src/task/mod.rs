//! Task module
//!
//! Task records, their document schema and the staged title input.

mod draft;
mod model;

pub use draft::TitleDraft;
pub use model::*;
