//! Deferred queue domain entities.

pub mod model;

pub use model::QueueEntry;
