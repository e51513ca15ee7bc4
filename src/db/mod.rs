//! Persistence layer
//!
//! `mongo` wraps the MongoDB driver with typed, auto-indexed collections.
//! `store` defines the [`EntityStore`] gateway trait the rest of the crate
//! talks to; `MongoStore` is the production implementation and
//! `MemoryStore` backs dev mode and unit tests.

pub mod memory;
pub mod mongo;
pub mod store;

pub use memory::MemoryStore;
pub use mongo::MongoClient;
pub use store::{EntityStore, MongoStore};
