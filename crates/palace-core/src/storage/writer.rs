//! Background persistence
//!
//! One writer task per partition drains a FIFO queue of full-collection
//! writes. Ordinary writes are fire-and-forget: a failure is logged and
//! counted, never reported to whoever caused it. Acknowledged writes (import,
//! reset) hand the result back through a oneshot channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::models::{Shelf, ShelfItem};
use crate::storage::durable::{DurableStore, Partition};
use crate::storage::error::{StorageError, StorageResult};

/// Outcome counters for one partition's writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistCounts {
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    succeeded: AtomicU64,
    failed: AtomicU64,
}

enum Job<I> {
    Write {
        shelves: Arc<Vec<Shelf<I>>>,
        ack: Option<oneshot::Sender<StorageResult<()>>>,
    },
    Barrier(oneshot::Sender<()>),
}

/// Pending acknowledgement of a forced write
pub struct WriteAck(oneshot::Receiver<StorageResult<()>>);

impl WriteAck {
    /// Wait for the write to finish
    pub async fn wait(self) -> StorageResult<()> {
        self.0
            .await
            .map_err(|_| StorageError::Background("persistence task stopped".to_string()))?
    }
}

/// Handle to a partition's writer task
///
/// The task stops once every handle has been dropped and the queue is empty.
pub struct PartitionWriter<I> {
    partition: Partition,
    tx: mpsc::UnboundedSender<Job<I>>,
    counters: Arc<Counters>,
}

impl<I: ShelfItem> PartitionWriter<I> {
    /// Start the writer task; must be called inside a tokio runtime
    pub fn spawn(durable: DurableStore, partition: Partition) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        tokio::spawn(writer_loop(durable, partition, rx, Arc::clone(&counters)));

        Self {
            partition,
            tx,
            counters,
        }
    }

    /// Queue a write and forget about it
    pub fn schedule(&self, shelves: Arc<Vec<Shelf<I>>>) {
        debug!(partition = %self.partition, shelves = shelves.len(), "Scheduling write-through");
        if self.tx.send(Job::Write { shelves, ack: None }).is_err() {
            warn!(partition = %self.partition, "Persistence task is gone; write dropped");
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Queue a write whose completion the caller will await
    ///
    /// The job is queued before this returns, so ordering relative to other
    /// writes is fixed at call time.
    pub fn write_acked(&self, shelves: Arc<Vec<Shelf<I>>>) -> WriteAck {
        let (ack, rx) = oneshot::channel();
        // A closed queue drops `ack`, which `WriteAck::wait` reports
        let _ = self.tx.send(Job::Write {
            shelves,
            ack: Some(ack),
        });
        WriteAck(rx)
    }

    /// Wait until every write queued before this call has finished
    pub async fn flush(&self) {
        let (done, rx) = oneshot::channel();
        if self.tx.send(Job::Barrier(done)).is_ok() {
            let _ = rx.await;
        }
    }

    pub fn counts(&self) -> PersistCounts {
        PersistCounts {
            succeeded: self.counters.succeeded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn writer_loop<I: ShelfItem>(
    durable: DurableStore,
    partition: Partition,
    mut rx: mpsc::UnboundedReceiver<Job<I>>,
    counters: Arc<Counters>,
) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Write { shelves, ack } => {
                let result = durable.replace_all(partition, &shelves).await;
                match &result {
                    Ok(()) => {
                        counters.succeeded.fetch_add(1, Ordering::Relaxed);
                        debug!(%partition, shelves = shelves.len(), "Persisted collection");
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(%partition, error = %e, "Failed to persist collection");
                    }
                }
                if let Some(ack) = ack {
                    let _ = ack.send(result);
                }
            }
            Job::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!(%partition, "Persistence task finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaShelf;
    use crate::seed::default_media;
    use crate::storage::MemoryBackend;

    #[tokio::test]
    async fn test_scheduled_writes_land_in_order() {
        let durable = DurableStore::new(MemoryBackend::new());
        let writer = PartitionWriter::spawn(durable.clone(), Partition::MEDIA);

        let full = Arc::new(default_media());
        let mut trimmed = default_media();
        trimmed.truncate(1);

        writer.schedule(Arc::clone(&full));
        writer.schedule(Arc::new(trimmed.clone()));
        writer.flush().await;

        let loaded: Vec<MediaShelf> = durable.load_all(Partition::MEDIA).await.unwrap();
        assert_eq!(loaded, trimmed);
        assert_eq!(writer.counts(), PersistCounts { succeeded: 2, failed: 0 });
    }

    #[tokio::test]
    async fn test_acked_write_reports_completion() {
        let durable = DurableStore::new(MemoryBackend::new());
        let writer = PartitionWriter::spawn(durable.clone(), Partition::MEDIA);

        writer
            .write_acked(Arc::new(default_media()))
            .wait()
            .await
            .unwrap();

        let loaded: Vec<MediaShelf> = durable.load_all(Partition::MEDIA).await.unwrap();
        assert_eq!(loaded, default_media());
    }
}
