//! Collaborator traits implemented by the adapter crates.

pub mod cache;
pub mod pubsub;

pub use cache::{CacheProvider, CacheProviderExt};
pub use pubsub::{PubSubProvider, Subscription};
