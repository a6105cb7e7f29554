//! Palace Core Library
//!
//! This crate provides the core of Palace, a personal collection keeper for
//! two kinds of things: coffee beans ("cafe") and albums ("audio"). Each
//! collection is an ordered list of shelves holding ordered items.
//!
//! # Architecture
//!
//! - **Store**: in-memory collections, the source of truth for reads
//! - **DurableStore**: partitioned key-value persistence (SQLite or memory),
//!   kept in sync by per-partition background writers
//!
//! Reads never touch the disk. Every change publishes a new immutable
//! collection value and queues a full-collection write.
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open()?;
//! store.ready().await;
//!
//! let shelf = store.ingredients().add_shelf("Single Origin")?;
//! store.ingredients().add_item(shelf, IngredientItem::new("Kenya AA"))?;
//!
//! store.export_snapshot(&DirectorySink::new(config.backup_dir()))?;
//! ```
//!
//! # Modules
//!
//! - `store`: collection store and sync controller (main entry point)
//! - `models`: shelves, beans and albums
//! - `collection`: copy-on-write mutations
//! - `reorder`: moving items between shelves
//! - `snapshot`: backup export and import
//! - `storage`: durable persistence
//! - `config`: application configuration

pub mod collection;
pub mod config;
pub mod ids;
pub mod models;
pub mod reorder;
pub mod seed;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use collection::{Mutation, MutationError};
pub use config::Config;
pub use models::{IngredientItem, IngredientShelf, MediaItem, MediaShelf, Roast, Shelf, ShelfItem};
pub use reorder::MoveRequest;
pub use snapshot::{DirectorySink, ImportError, Snapshot, SnapshotSink};
pub use storage::{DurableStore, MemoryBackend, SqliteBackend, StorageError};
pub use store::{CollectionHandle, PersistStats, Store};
