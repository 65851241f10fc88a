//! State module for tracking chain progress
//!
//! This module provides the data model shared by the engine and the store.
//!
//! # Components
//!
//! - `Source`: one document being downloaded, keyed by a `SourceId`
//! - `ProgressRecord`: persisted visited set, cursor and output location
//! - `TraversalState`: the engine's state machine for one run

mod progress;
mod source;
mod traversal_state;

// Re-export main types
pub use progress::ProgressRecord;
pub use source::{Source, SourceId};
pub use traversal_state::TraversalState;
