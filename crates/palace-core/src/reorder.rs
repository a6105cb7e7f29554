//! Moving items between shelves
//!
//! A move works on a full copy of the collection. The collection value passed
//! in is never touched, so anyone still holding it keeps a valid, unchanged
//! view. When nothing can move (unknown shelf, empty source slot) the input
//! `Arc` itself is returned.

use std::sync::Arc;

use crate::models::Shelf;

/// Where an item comes from and where it goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub source_shelf: i64,
    pub source_index: usize,
    pub target_shelf: i64,
    /// `None` appends to the end of the target shelf
    pub target_index: Option<usize>,
}

impl MoveRequest {
    /// Move to a specific position
    pub fn to_index(source_shelf: i64, source_index: usize, target_shelf: i64, target_index: usize) -> Self {
        Self {
            source_shelf,
            source_index,
            target_shelf,
            target_index: Some(target_index),
        }
    }

    /// Move to the end of the target shelf
    pub fn to_end(source_shelf: i64, source_index: usize, target_shelf: i64) -> Self {
        Self {
            source_shelf,
            source_index,
            target_shelf,
            target_index: None,
        }
    }

    /// True when the item would land where it already is
    ///
    /// Callers skip these; `move_item` still produces an equivalent copy.
    pub fn is_identity(&self) -> bool {
        self.source_shelf == self.target_shelf && self.target_index == Some(self.source_index)
    }
}

/// Move one item, returning the new collection
///
/// - unknown source or target shelf: the input is returned as-is
/// - out-of-range source index: the input is returned as-is
/// - target index past the end: behaves as append
///
/// The total item count is the same before and after every call.
pub fn move_item<I: Clone>(shelves: &Arc<Vec<Shelf<I>>>, request: MoveRequest) -> Arc<Vec<Shelf<I>>> {
    let source = shelves.iter().position(|s| s.id == request.source_shelf);
    let target = shelves.iter().position(|s| s.id == request.target_shelf);
    let (Some(source), Some(target)) = (source, target) else {
        return Arc::clone(shelves);
    };
    if request.source_index >= shelves[source].items.len() {
        return Arc::clone(shelves);
    }

    let mut next: Vec<Shelf<I>> = shelves.as_ref().clone();

    let item = next[source].items.remove(request.source_index);
    let items = &mut next[target].items;
    match request.target_index {
        Some(index) => items.insert(index.min(items.len()), item),
        None => items.push(item),
    }

    Arc::new(next)
}
