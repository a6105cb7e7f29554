//! Storage layer
//!
//! Durable persistence for the two collections.
//!
//! ## Architecture
//!
//! - **DurableStore**: async, partitioned key-value facade (one partition per
//!   collection, records keyed by shelf id)
//! - **Engines**: SQLite on disk, or an in-memory map
//! - **PartitionWriter**: per-partition background queue that mirrors every
//!   in-memory change to the durable store

pub mod durable;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod writer;

pub use durable::{Backend, DurableStore, Partition, StoredRecord};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
pub use writer::{PartitionWriter, PersistCounts, WriteAck};
