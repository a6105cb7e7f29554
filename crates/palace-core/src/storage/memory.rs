//! In-memory storage engine
//!
//! Same semantics as the SQLite engine, kept for tests and for sessions that
//! should not touch disk.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::storage::durable::{Backend, Partition, StoredRecord};
use crate::storage::error::{StorageError, StorageResult};

/// Process-local [`Backend`]
#[derive(Debug, Default)]
pub struct MemoryBackend {
    partitions: Mutex<HashMap<&'static str, Vec<StoredRecord>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn open(&self, partitions: &[Partition]) -> StorageResult<()> {
        let mut map = self.partitions.lock().unwrap_or_else(PoisonError::into_inner);
        for partition in partitions {
            map.entry(partition.name()).or_default();
        }
        Ok(())
    }

    fn replace_all(&self, partition: Partition, records: &[StoredRecord]) -> StorageResult<()> {
        let mut deduped: Vec<StoredRecord> = Vec::with_capacity(records.len());
        for record in records {
            deduped.retain(|r| r.id != record.id);
            deduped.push(record.clone());
        }

        let mut map = self.partitions.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = map.get_mut(partition.name()).ok_or_else(|| unknown(partition))?;
        *slot = deduped;
        Ok(())
    }

    fn load_all(&self, partition: Partition) -> StorageResult<Vec<StoredRecord>> {
        let map = self.partitions.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(partition.name())
            .cloned()
            .ok_or_else(|| unknown(partition))
    }
}

fn unknown(partition: Partition) -> StorageError {
    StorageError::Unavailable {
        reason: format!("partition '{}' has not been opened", partition),
    }
}
