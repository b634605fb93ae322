//! Concrete repository implementations.

pub mod queue_entry;
