//! Durable partitioned key-value store
//!
//! A `DurableStore` is a named set of partitions, each mapping shelf id to a
//! shelf record. The engine behind it is a synchronous [`Backend`]; every
//! call runs on tokio's blocking pool so callers see an async API.
//!
//! Failure semantics are fail-fast: errors go straight back to the caller and
//! nothing is retried here.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::models::{Shelf, ShelfItem};
use crate::storage::error::{StorageError, StorageResult};

/// A durable namespace holding the shelves of one collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition(&'static str);

impl Partition {
    /// Partition backing the ingredient collection
    pub const INGREDIENTS: Partition = Partition("cafe_shelves");
    /// Partition backing the media collection
    pub const MEDIA: Partition = Partition("audio_shelves");
    /// Every partition the store knows about
    pub const ALL: [Partition; 2] = [Partition::INGREDIENTS, Partition::MEDIA];

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

/// One encoded shelf as the engine sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Shelf id (the record key)
    pub id: i64,
    /// JSON document `{ id, title, items }`
    pub payload: String,
}

/// Storage engine behind a [`DurableStore`]
///
/// Implementations must make `replace_all` atomic: a concurrent `load_all`
/// sees either the old contents or the new ones, never a mix. Records with a
/// repeated id overwrite earlier ones. `load_all` returns records in the
/// order they were written.
pub trait Backend: Send + Sync {
    /// Create any missing partitions; must be idempotent
    fn open(&self, partitions: &[Partition]) -> StorageResult<()>;

    /// Clear the partition and write every record as one unit
    fn replace_all(&self, partition: Partition, records: &[StoredRecord]) -> StorageResult<()>;

    /// Every record currently in the partition
    fn load_all(&self, partition: Partition) -> StorageResult<Vec<StoredRecord>>;
}

/// Lets a caller keep its own handle on an engine it gave to a store
impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn open(&self, partitions: &[Partition]) -> StorageResult<()> {
        (**self).open(partitions)
    }

    fn replace_all(&self, partition: Partition, records: &[StoredRecord]) -> StorageResult<()> {
        (**self).replace_all(partition, records)
    }

    fn load_all(&self, partition: Partition) -> StorageResult<Vec<StoredRecord>> {
        (**self).load_all(partition)
    }
}

#[derive(Debug, Clone)]
enum OpenState {
    Closed,
    Open,
    Failed(String),
}

/// Async handle over a storage engine
///
/// Cheap to clone; clones share the engine and the open state.
#[derive(Clone)]
pub struct DurableStore {
    backend: Arc<dyn Backend>,
    state: Arc<Mutex<OpenState>>,
}

impl DurableStore {
    /// Wrap a storage engine
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            state: Arc::new(Mutex::new(OpenState::Closed)),
        }
    }

    /// Open every partition
    ///
    /// Idempotent. If opening fails, the handle stays unusable: this and every
    /// later call return [`StorageError::Unavailable`].
    pub async fn open(&self) -> StorageResult<()> {
        match self.open_state() {
            OpenState::Open => return Ok(()),
            OpenState::Failed(reason) => return Err(StorageError::Unavailable { reason }),
            OpenState::Closed => {}
        }

        let backend = Arc::clone(&self.backend);
        let result = run_blocking(move || backend.open(&Partition::ALL)).await;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(()) => {
                debug!("Durable store opened");
                *state = OpenState::Open;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to open durable store");
                let reason = e.to_string();
                *state = OpenState::Failed(reason.clone());
                Err(StorageError::Unavailable { reason })
            }
        }
    }

    /// The error a previous failed `open` left behind
    pub fn open_error(&self) -> Option<StorageError> {
        match self.open_state() {
            OpenState::Failed(reason) => Some(StorageError::Unavailable { reason }),
            _ => None,
        }
    }

    /// Replace the partition's contents with `shelves`
    ///
    /// Shelf order is preserved. On error the caller must not assume anything
    /// was written.
    pub async fn replace_all<I: ShelfItem>(
        &self,
        partition: Partition,
        shelves: &[Shelf<I>],
    ) -> StorageResult<()> {
        self.open().await?;

        let records = shelves
            .iter()
            .map(|shelf| {
                Ok(StoredRecord {
                    id: shelf.id,
                    payload: serde_json::to_string(shelf)?,
                })
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let backend = Arc::clone(&self.backend);
        run_blocking(move || backend.replace_all(partition, &records)).await
    }

    /// Load every shelf stored in the partition, in stored order
    pub async fn load_all<I: ShelfItem>(&self, partition: Partition) -> StorageResult<Vec<Shelf<I>>> {
        self.open().await?;

        let backend = Arc::clone(&self.backend);
        let records = run_blocking(move || backend.load_all(partition)).await?;

        records
            .into_iter()
            .map(|record| {
                serde_json::from_str(&record.payload).map_err(|source| StorageError::CorruptRecord {
                    partition: partition.name(),
                    id: record.id,
                    source,
                })
            })
            .collect()
    }

    fn open_state(&self) -> OpenState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("state", &self.open_state())
            .finish()
    }
}

async fn run_blocking<T, F>(f: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StorageResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Background(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaItem, MediaShelf};
    use crate::seed::default_media;
    use crate::storage::MemoryBackend;

    struct BrokenBackend;

    impl Backend for BrokenBackend {
        fn open(&self, _partitions: &[Partition]) -> StorageResult<()> {
            Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "engine offline",
            )))
        }

        fn replace_all(&self, _partition: Partition, _records: &[StoredRecord]) -> StorageResult<()> {
            Ok(())
        }

        fn load_all(&self, _partition: Partition) -> StorageResult<Vec<StoredRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_replace_then_load_preserves_order() {
        let store = DurableStore::new(MemoryBackend::new());
        let mut shelves = default_media();
        shelves.reverse();

        store.replace_all(Partition::MEDIA, &shelves).await.unwrap();
        let loaded: Vec<MediaShelf> = store.load_all(Partition::MEDIA).await.unwrap();

        assert_eq!(loaded, shelves);
    }

    #[tokio::test]
    async fn test_partitions_are_independent() {
        let store = DurableStore::new(MemoryBackend::new());
        store.replace_all(Partition::MEDIA, &default_media()).await.unwrap();

        let other: Vec<MediaShelf> = store.load_all(Partition::INGREDIENTS).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_replace_all_clears_previous_contents() {
        let store = DurableStore::new(MemoryBackend::new());
        store.replace_all(Partition::MEDIA, &default_media()).await.unwrap();
        store
            .replace_all::<MediaItem>(Partition::MEDIA, &[Shelf::new(9, "Only")])
            .await
            .unwrap();

        let loaded: Vec<MediaShelf> = store.load_all(Partition::MEDIA).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 9);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let store = DurableStore::new(MemoryBackend::new());
        store.open().await.unwrap();
        store.open().await.unwrap();
        assert!(store.open_error().is_none());
    }

    #[tokio::test]
    async fn test_failed_open_is_fatal_for_handle() {
        let store = DurableStore::new(BrokenBackend);

        assert!(matches!(
            store.open().await,
            Err(StorageError::Unavailable { .. })
        ));
        assert!(matches!(store.open_error(), Some(StorageError::Unavailable { .. })));

        let load = store.load_all::<MediaItem>(Partition::MEDIA).await;
        assert!(matches!(load, Err(StorageError::Unavailable { .. })));

        let write = store.replace_all(Partition::MEDIA, &default_media()).await;
        assert!(matches!(write, Err(StorageError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_corrupt_record_reported() {
        let backend = MemoryBackend::new();
        backend.open(&Partition::ALL).unwrap();
        backend
            .replace_all(
                Partition::MEDIA,
                &[StoredRecord {
                    id: 3,
                    payload: "{not json".to_string(),
                }],
            )
            .unwrap();

        let store = DurableStore::new(backend);
        let err = store.load_all::<MediaItem>(Partition::MEDIA).await.unwrap_err();
        assert!(matches!(err, StorageError::CorruptRecord { id: 3, .. }));
    }
}
