//! Unified storage interface
//!
//! The `Store` owns the in-memory state of both collections and keeps it
//! mirrored to the durable store:
//! - startup: defaults are visible immediately, stored shelves replace them
//!   once the asynchronous load finishes
//! - write-through: after the load, every change queues a full-collection
//!   write on that collection's partition writer
//! - import / reset: replace whole collections and wait for the writes
//!
//! ## Loading gate
//!
//! Nothing is written while the store is loading, otherwise a change made
//! before the load finished would overwrite data that has not been read yet.
//! Changes made during the load are shown immediately, remembered, and
//! replayed on top of the loaded shelves; the result is then written once.
//! When nothing changed during the load, no write happens at all.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open_with_config(&config); // inside a tokio runtime
//! store.ready().await;
//!
//! let shelf = store.media().add_shelf("Road Trip")?;
//! store.media().add_item(shelf, MediaItem::new())?;
//!
//! store.flush().await; // wait for the background writes
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::collection::{apply, Mutation, MutationError};
use crate::config::Config;
use crate::ids::IdGenerator;
use crate::models::{item_count, max_id, IngredientItem, MediaItem, Shelf, ShelfItem};
use crate::reorder::MoveRequest;
use crate::seed::{default_ingredients, default_media};
use crate::snapshot::{backup_file_name, Snapshot, SnapshotImport, SnapshotSink};
use crate::storage::{
    DurableStore, Partition, PartitionWriter, PersistCounts, SqliteBackend, StorageError,
    StorageResult, WriteAck,
};

/// Write outcome counters for both partitions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistStats {
    pub ingredients: PersistCounts,
    pub media: PersistCounts,
}

impl PersistStats {
    pub fn failed(&self) -> u64 {
        self.ingredients.failed + self.media.failed
    }
}

struct Gate {
    loading: bool,
}

/// One collection's state and its writer
struct Collection<I> {
    partition: Partition,
    current: watch::Sender<Arc<Vec<Shelf<I>>>>,
    /// Changes made while loading, replayed once the load finishes
    deferred: Mutex<Vec<Mutation<I>>>,
    writer: PartitionWriter<I>,
}

impl<I: ShelfItem> Collection<I> {
    fn new(durable: &DurableStore, partition: Partition, defaults: Vec<Shelf<I>>) -> Self {
        let (current, _) = watch::channel(Arc::new(defaults));
        Self {
            partition,
            current,
            deferred: Mutex::new(Vec::new()),
            writer: PartitionWriter::spawn(durable.clone(), partition),
        }
    }

    fn current(&self) -> Arc<Vec<Shelf<I>>> {
        Arc::clone(&self.current.borrow())
    }

    fn publish(&self, next: Arc<Vec<Shelf<I>>>) {
        self.current.send_replace(next);
    }

    fn deferred(&self) -> MutexGuard<'_, Vec<Mutation<I>>> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in the loaded shelves and replay changes made in the meantime
    ///
    /// Called with the gate held.
    fn finish_load(&self, loaded: Option<Vec<Shelf<I>>>, ids: &IdGenerator) {
        let deferred = std::mem::take(&mut *self.deferred());

        // Only a collection that ends up different from storage is written
        let changed = match loaded {
            Some(shelves) => {
                let loaded = Arc::new(shelves);
                let mut next = Arc::clone(&loaded);
                for mutation in &deferred {
                    match apply(&next, mutation) {
                        Ok(applied) => next = applied,
                        Err(e) => warn!(
                            partition = %self.partition,
                            error = %e,
                            "Dropping change made while loading"
                        ),
                    }
                }
                self.publish(Arc::clone(&next));
                (!Arc::ptr_eq(&loaded, &next)).then_some(next)
            }
            // Defaults stayed in place, deferred changes are already applied
            None => (!deferred.is_empty()).then(|| self.current()),
        };

        if let Some(id) = max_id(&self.current()) {
            ids.observe(id);
        }

        if let Some(next) = changed {
            debug!(
                partition = %self.partition,
                changes = deferred.len(),
                "Persisting changes made while loading"
            );
            self.writer.schedule(next);
        }
    }

    /// Replace the whole collection and queue an acknowledged write
    ///
    /// Called with the gate held, after loading.
    fn replace(&self, shelves: Vec<Shelf<I>>, ids: &IdGenerator) -> WriteAck {
        let next = Arc::new(shelves);
        if let Some(id) = max_id(&next) {
            ids.observe(id);
        }
        self.publish(Arc::clone(&next));
        self.writer.write_acked(next)
    }
}

struct Inner {
    gate: Mutex<Gate>,
    loading: watch::Sender<bool>,
    ingredients: Collection<IngredientItem>,
    media: Collection<MediaItem>,
    durable: DurableStore,
    ids: IdGenerator,
}

impl Inner {
    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory collections kept in sync with a durable store
///
/// Cheap to clone; clones share state. Independent instances (for example
/// one per test) never share anything.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    /// Open the store at the configured location
    ///
    /// Must be called inside a tokio runtime.
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Ok(Self::open_with_config(&config))
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: &Config) -> Self {
        Self::with_durable(DurableStore::new(SqliteBackend::new(config.database_path())))
    }

    /// Build a store over any durable store and start loading from it
    ///
    /// Defaults are visible right away; [`Store::ready`] resolves once the
    /// stored collections (if any) have replaced them.
    pub fn with_durable(durable: DurableStore) -> Self {
        let (loading, _) = watch::channel(true);
        let inner = Arc::new(Inner {
            gate: Mutex::new(Gate { loading: true }),
            loading,
            ingredients: Collection::new(&durable, Partition::INGREDIENTS, default_ingredients()),
            media: Collection::new(&durable, Partition::MEDIA, default_media()),
            durable,
            ids: IdGenerator::new(),
        });

        tokio::spawn(load(Arc::clone(&inner)));

        Self { inner }
    }

    /// Whether the startup load is still running
    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    /// Watch the loading flag
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    /// Wait for the startup load to finish
    pub async fn ready(&self) {
        let mut rx = self.subscribe_loading();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|loading| !*loading).await;
    }

    /// The ingredient (cafe) collection
    pub fn ingredients(&self) -> CollectionHandle<'_, IngredientItem> {
        CollectionHandle {
            store: self,
            collection: &self.inner.ingredients,
        }
    }

    /// The media (audio) collection
    pub fn media(&self) -> CollectionHandle<'_, MediaItem> {
        CollectionHandle {
            store: self,
            collection: &self.inner.media,
        }
    }

    /// Wait until every write queued so far has completed
    pub async fn flush(&self) {
        self.inner.ingredients.writer.flush().await;
        self.inner.media.writer.flush().await;
    }

    /// Background write outcomes so far
    pub fn persist_stats(&self) -> PersistStats {
        PersistStats {
            ingredients: self.inner.ingredients.writer.counts(),
            media: self.inner.media.writer.counts(),
        }
    }

    /// Whether the durable store could not be opened
    pub fn is_durable_unavailable(&self) -> bool {
        self.durable_error().is_some()
    }

    /// Why the durable store could not be opened, if it could not
    pub fn durable_error(&self) -> Option<StorageError> {
        self.inner.durable.open_error()
    }

    // ==================== Snapshots ====================

    /// Capture both collections as a backup document
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.inner.ingredients.current().as_ref().clone(),
            self.inner.media.current().as_ref().clone(),
            Utc::now(),
        )
    }

    /// Export a backup to `sink`, returning the file name used
    pub fn export_snapshot(&self, sink: &dyn SnapshotSink) -> Result<String> {
        let snapshot = self.snapshot();
        let file_name = backup_file_name(Utc::now());
        let json = snapshot.to_json().context("Failed to serialize backup")?;

        sink.save(&file_name, json.as_bytes())?;
        info!(file = %file_name, "Exported backup");
        Ok(file_name)
    }

    /// Import a backup document
    ///
    /// Returns `false` when `raw` is not a valid backup, including one whose
    /// ids repeat within a collection; nothing changes in that case. Each collection present in the document replaces the
    /// in-memory one, and its write is awaited before returning. A missing
    /// key leaves that collection alone; a document with neither key is a
    /// successful no-op. A failed write also yields `false`, although the
    /// in-memory state has already been replaced by then.
    pub async fn import_snapshot(&self, raw: &str) -> bool {
        let parsed = match SnapshotImport::parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Invalid backup file");
                return false;
            }
        };

        if parsed.is_empty() {
            warn!("Backup contains no known collections; nothing imported");
            return true;
        }

        self.ready().await;

        let acks = {
            let _gate = self.inner.gate();
            let mut acks = Vec::new();
            if let Some(shelves) = parsed.ingredients {
                acks.push(self.inner.ingredients.replace(shelves, &self.inner.ids));
            }
            if let Some(shelves) = parsed.media {
                acks.push(self.inner.media.replace(shelves, &self.inner.ids));
            }
            acks
        };

        match wait_for_writes(acks).await {
            Ok(()) => {
                info!("Imported backup");
                true
            }
            Err(_) => false,
        }
    }

    /// Replace both collections with the built-in defaults
    ///
    /// Confirmation is the caller's job. Both writes are awaited.
    pub async fn reset_to_defaults(&self) -> StorageResult<()> {
        self.ready().await;

        let acks = {
            let _gate = self.inner.gate();
            vec![
                self.inner
                    .ingredients
                    .replace(default_ingredients(), &self.inner.ids),
                self.inner.media.replace(default_media(), &self.inner.ids),
            ]
        };

        wait_for_writes(acks).await?;
        info!("Collections reset to defaults");
        Ok(())
    }

    // ==================== Mutations ====================

    /// Apply a change computed from the current state
    ///
    /// Returns whether the collection changed. Runs under the gate, so the
    /// order of queued writes matches the order of changes.
    fn mutate_with<I, F>(&self, collection: &Collection<I>, build: F) -> Result<bool, MutationError>
    where
        I: ShelfItem,
        F: FnOnce(&[Shelf<I>]) -> Result<Mutation<I>, MutationError>,
    {
        let gate = self.inner.gate();
        let current = collection.current();
        let mutation = build(current.as_slice())?;
        let next = apply(&current, &mutation)?;

        if Arc::ptr_eq(&current, &next) {
            return Ok(false);
        }

        collection.publish(Arc::clone(&next));
        if gate.loading {
            debug!(partition = %collection.partition, "Still loading; deferring write");
            collection.deferred().push(mutation.anchored(&current));
        } else {
            collection.writer.schedule(next);
        }
        Ok(true)
    }

    fn mutate<I: ShelfItem>(
        &self,
        collection: &Collection<I>,
        mutation: Mutation<I>,
    ) -> Result<bool, MutationError> {
        self.mutate_with(collection, |_| Ok(mutation))
    }
}

/// Startup load: read both partitions, then open the gate
async fn load(inner: Arc<Inner>) {
    let ingredients = load_partition::<IngredientItem>(&inner.durable, Partition::INGREDIENTS).await;
    let media = load_partition::<MediaItem>(&inner.durable, Partition::MEDIA).await;

    {
        let mut gate = inner.gate();
        inner.ingredients.finish_load(ingredients, &inner.ids);
        inner.media.finish_load(media, &inner.ids);
        gate.loading = false;
        inner.loading.send_replace(false);
    }

    info!("Collections loaded");
}

/// `None` means "keep the defaults"
async fn load_partition<I: ShelfItem>(
    durable: &DurableStore,
    partition: Partition,
) -> Option<Vec<Shelf<I>>> {
    match durable.load_all(partition).await {
        Ok(shelves) if !shelves.is_empty() => {
            debug!(%partition, shelves = shelves.len(), "Loaded stored shelves");
            Some(shelves)
        }
        Ok(_) => {
            debug!(%partition, "Nothing stored yet; using defaults");
            None
        }
        Err(e) => {
            warn!(%partition, error = %e, "Failed to load shelves; using defaults");
            None
        }
    }
}

async fn wait_for_writes(acks: Vec<WriteAck>) -> StorageResult<()> {
    let mut first_error = None;
    for ack in acks {
        if let Err(e) = ack.wait().await {
            warn!(error = %e, "Forced write failed");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Mutation and read access to one collection
pub struct CollectionHandle<'a, I> {
    store: &'a Store,
    collection: &'a Collection<I>,
}

impl<'a, I: ShelfItem> CollectionHandle<'a, I> {
    /// Current shelves; later changes never affect the returned value
    pub fn shelves(&self) -> Arc<Vec<Shelf<I>>> {
        self.collection.current()
    }

    /// Watch the collection; every change publishes a new value
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Shelf<I>>>> {
        self.collection.current.subscribe()
    }

    pub fn shelf(&self, shelf_id: i64) -> Option<Shelf<I>> {
        self.shelves().iter().find(|s| s.id == shelf_id).cloned()
    }

    /// Find an item anywhere in the collection, with its shelf id
    pub fn find_item(&self, item_id: i64) -> Option<(i64, I)> {
        self.shelves().iter().find_map(|shelf| {
            shelf
                .items
                .iter()
                .find(|item| item.id() == item_id)
                .map(|item| (shelf.id, item.clone()))
        })
    }

    pub fn item_count(&self) -> usize {
        item_count(&self.shelves())
    }

    /// Append a new, empty shelf; returns its id
    pub fn add_shelf(&self, title: impl Into<String>) -> Result<i64, MutationError> {
        let id = self.store.inner.ids.next_id();
        self.store
            .mutate(self.collection, Mutation::AddShelf(Shelf::new(id, title)))?;
        Ok(id)
    }

    pub fn rename_shelf(&self, shelf_id: i64, title: impl Into<String>) -> Result<(), MutationError> {
        self.store.mutate(
            self.collection,
            Mutation::RenameShelf {
                shelf_id,
                title: title.into(),
            },
        )?;
        Ok(())
    }

    /// Remove a shelf and everything on it
    pub fn delete_shelf(&self, shelf_id: i64) -> Result<(), MutationError> {
        self.store
            .mutate(self.collection, Mutation::RemoveShelf { shelf_id })?;
        Ok(())
    }

    /// Append an item to a shelf; a fresh id is assigned and returned
    pub fn add_item(&self, shelf_id: i64, item: I) -> Result<i64, MutationError> {
        self.add_item_at(shelf_id, None, item)
    }

    /// Insert an item at `index` (past the end appends)
    pub fn insert_item(&self, shelf_id: i64, index: usize, item: I) -> Result<i64, MutationError> {
        self.add_item_at(shelf_id, Some(index), item)
    }

    fn add_item_at(&self, shelf_id: i64, index: Option<usize>, mut item: I) -> Result<i64, MutationError> {
        let id = self.store.inner.ids.next_id();
        item.set_id(id);
        self.store.mutate(
            self.collection,
            Mutation::AddItem {
                shelf_id,
                item,
                index,
            },
        )?;
        Ok(id)
    }

    /// Replace an item (matched by id) with a new version
    pub fn update_item(&self, shelf_id: i64, item: I) -> Result<(), MutationError> {
        self.store
            .mutate(self.collection, Mutation::ReplaceItem { shelf_id, item })?;
        Ok(())
    }

    pub fn delete_item(&self, shelf_id: i64, item_id: i64) -> Result<(), MutationError> {
        self.store
            .mutate(self.collection, Mutation::RemoveItem { shelf_id, item_id })?;
        Ok(())
    }

    /// Move an item between shelves
    ///
    /// Returns `false` when either shelf is unknown or the source slot is
    /// empty, in which case nothing changes and nothing is written.
    pub fn move_item(&self, request: MoveRequest) -> bool {
        self.store
            .mutate(self.collection, Mutation::Move(request))
            .unwrap_or(false)
    }
}

impl CollectionHandle<'_, MediaItem> {
    /// Flip an album's favorite flag; returns the new value
    pub fn toggle_favorite(&self, shelf_id: i64, item_id: i64) -> Result<bool, MutationError> {
        let mut favorite = false;
        self.store.mutate_with(self.collection, |shelves| {
            let mut item = shelves
                .iter()
                .find(|s| s.id == shelf_id)
                .ok_or(MutationError::ShelfNotFound(shelf_id))?
                .items
                .iter()
                .find(|i| i.id == item_id)
                .cloned()
                .ok_or(MutationError::ItemNotFound { shelf_id, item_id })?;
            favorite = !item.is_favorite();
            item.favorite = Some(favorite);
            Ok(Mutation::ReplaceItem { shelf_id, item })
        })?;
        Ok(favorite)
    }

    /// Every favorite album, in shelf order
    pub fn favorites(&self) -> Vec<MediaItem> {
        self.shelves()
            .iter()
            .flat_map(|shelf| shelf.items.iter())
            .filter(|item| item.is_favorite())
            .cloned()
            .collect()
    }
}
