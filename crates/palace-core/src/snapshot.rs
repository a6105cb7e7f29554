//! Whole-state backup documents
//!
//! A snapshot captures both collections plus a format version:
//!
//! ```text
//! { "cafe": Shelf[], "audio": Shelf[], "version": 1, "timestamp": "2024-05-01T10:00:00.000Z" }
//! ```
//!
//! Import is lenient about everything except the collections themselves:
//! unrecognized keys are ignored and either collection key may be missing,
//! but a recognized key whose value is not a list of shelves rejects the
//! whole document. So does a collection whose ids repeat (shelf ids among
//! shelves, item ids among items) or exceed [`MAX_ID`]: storage keys shelves
//! by id, and such a collection could not be stored as shown.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::MAX_ID;
use crate::models::{IngredientShelf, MediaShelf, Shelf, ShelfItem};
use crate::storage::{StorageError, StorageResult};

/// Backup format version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

/// A full backup of both collections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    #[serde(rename = "cafe")]
    pub ingredients: Vec<IngredientShelf>,
    #[serde(rename = "audio")]
    pub media: Vec<MediaShelf>,
    pub version: u32,
    /// ISO-8601, millisecond precision, UTC
    pub timestamp: String,
}

impl Snapshot {
    /// Capture the given collections at `taken_at`
    pub fn new(
        ingredients: Vec<IngredientShelf>,
        media: Vec<MediaShelf>,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ingredients,
            media,
            version: SNAPSHOT_VERSION,
            timestamp: taken_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Pretty-printed JSON document
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Why a backup document was rejected
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed backup: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Id {id} appears more than once in '{collection}'")]
    DuplicateId { collection: &'static str, id: i64 },

    #[error("Id {id} in '{collection}' is out of range")]
    IdOutOfRange { collection: &'static str, id: i64 },
}

/// The parts of a backup document that import acts on
///
/// `None` means the key was absent (or null) and that collection must be left
/// alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SnapshotImport {
    #[serde(rename = "cafe", default)]
    pub ingredients: Option<Vec<IngredientShelf>>,
    #[serde(rename = "audio", default)]
    pub media: Option<Vec<MediaShelf>>,
}

impl SnapshotImport {
    /// Parse and check a backup document
    pub fn parse(raw: &str) -> Result<Self, ImportError> {
        let parsed: Self = serde_json::from_str(raw)?;
        if let Some(shelves) = &parsed.ingredients {
            check_ids("cafe", shelves)?;
        }
        if let Some(shelves) = &parsed.media {
            check_ids("audio", shelves)?;
        }
        Ok(parsed)
    }

    /// Neither collection key was present
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_none() && self.media.is_none()
    }
}

fn check_ids<I: ShelfItem>(collection: &'static str, shelves: &[Shelf<I>]) -> Result<(), ImportError> {
    let mut shelf_ids = HashSet::new();
    let mut item_ids = HashSet::new();

    for shelf in shelves {
        check_id(collection, shelf.id, &mut shelf_ids)?;
        for item in &shelf.items {
            check_id(collection, item.id(), &mut item_ids)?;
        }
    }
    Ok(())
}

fn check_id(collection: &'static str, id: i64, seen: &mut HashSet<i64>) -> Result<(), ImportError> {
    if !(-MAX_ID..=MAX_ID).contains(&id) {
        return Err(ImportError::IdOutOfRange { collection, id });
    }
    if !seen.insert(id) {
        return Err(ImportError::DuplicateId { collection, id });
    }
    Ok(())
}

/// Suggested file name for a backup taken at `at`
pub fn backup_file_name(at: DateTime<Utc>) -> String {
    format!("backup_{}.json", at.format("%Y-%m-%d"))
}

/// Receives exported backups
pub trait SnapshotSink {
    /// Store `contents` under `file_name`
    fn save(&self, file_name: &str, contents: &[u8]) -> Result<()>;
}

/// Writes backups into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path a backup with this name ends up at
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }
}

impl SnapshotSink for DirectorySink {
    fn save(&self, file_name: &str, contents: &[u8]) -> Result<()> {
        let path = self.path_for(file_name);
        atomic_write(&path, contents)
            .with_context(|| format!("Failed to save backup to {:?}", path))
    }
}

/// Replace `path` with `data` so readers never see a partial file
///
/// The bytes go to a sibling `.tmp` file, are synced, and the temp file is
/// renamed over the target.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");
    let io_error = |e| StorageError::from_io(e, temp_path.clone());

    let mut file = File::create(&temp_path).map_err(io_error)?;
    file.write_all(data).map_err(io_error)?;
    file.sync_all().map_err(io_error)?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })
}
