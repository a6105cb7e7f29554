//! Collection mutations
//!
//! Every change to a collection is described by a [`Mutation`] and applied
//! copy-on-write by [`apply`]: the current `Arc` is never modified, a new
//! collection value is built instead. The store publishes that value as
//! current and hands it to the background writer.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{Shelf, ShelfItem};
use crate::reorder::{move_item, MoveRequest};

/// Errors from applying a mutation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("No shelf with id {0}")]
    ShelfNotFound(i64),

    #[error("No item with id {item_id} on shelf {shelf_id}")]
    ItemNotFound { shelf_id: i64, item_id: i64 },

    #[error("Id {0} is already used in this collection")]
    DuplicateId(i64),
}

/// A single change to one collection
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<I> {
    /// Append a shelf
    AddShelf(Shelf<I>),
    RenameShelf { shelf_id: i64, title: String },
    RemoveShelf { shelf_id: i64 },
    /// Insert an item at `index`, or append when `None`
    AddItem {
        shelf_id: i64,
        item: I,
        index: Option<usize>,
    },
    /// Full-record replace, matched by the item's id
    ReplaceItem { shelf_id: i64, item: I },
    RemoveItem { shelf_id: i64, item_id: i64 },
    /// Positional move
    Move(MoveRequest),
    /// Move the item with this id, wherever it sits on `source_shelf`
    ///
    /// Positional moves made while loading are remembered in this form, so
    /// replaying them onto the loaded shelves moves the same record.
    MoveItem {
        source_shelf: i64,
        item_id: i64,
        target_shelf: i64,
        target_index: Option<usize>,
    },
}

impl<I: ShelfItem> Mutation<I> {
    /// Anchor a positional move to the id of the item it moves
    ///
    /// Other mutations, and moves whose source slot is empty, come back
    /// unchanged.
    pub fn anchored(self, shelves: &[Shelf<I>]) -> Self {
        let Mutation::Move(request) = self else {
            return self;
        };
        let item_id = shelves
            .iter()
            .find(|s| s.id == request.source_shelf)
            .and_then(|s| s.items.get(request.source_index))
            .map(|item| item.id());

        match item_id {
            Some(item_id) => Mutation::MoveItem {
                source_shelf: request.source_shelf,
                item_id,
                target_shelf: request.target_shelf,
                target_index: request.target_index,
            },
            None => Mutation::Move(request),
        }
    }
}

/// Apply a mutation, producing the next collection value
///
/// Returns the input `Arc` unchanged (pointer-equal) when the mutation is a
/// no-op; only moves have no-op outcomes, the other variants error instead.
pub fn apply<I: ShelfItem>(
    shelves: &Arc<Vec<Shelf<I>>>,
    mutation: &Mutation<I>,
) -> Result<Arc<Vec<Shelf<I>>>, MutationError> {
    match mutation {
        Mutation::Move(request) => Ok(move_item(shelves, *request)),
        Mutation::MoveItem {
            source_shelf,
            item_id,
            target_shelf,
            target_index,
        } => {
            let source_index = shelves
                .iter()
                .find(|s| s.id == *source_shelf)
                .ok_or(MutationError::ShelfNotFound(*source_shelf))?
                .position_of(*item_id)
                .ok_or(MutationError::ItemNotFound {
                    shelf_id: *source_shelf,
                    item_id: *item_id,
                })?;
            let request = MoveRequest {
                source_shelf: *source_shelf,
                source_index,
                target_shelf: *target_shelf,
                target_index: *target_index,
            };
            Ok(move_item(shelves, request))
        }
        Mutation::AddShelf(shelf) => edited(shelves, |next| {
            if next.iter().any(|s| s.id == shelf.id) {
                return Err(MutationError::DuplicateId(shelf.id));
            }
            if let Some(item) = shelf.items.iter().find(|i| contains_item(next, i.id())) {
                return Err(MutationError::DuplicateId(item.id()));
            }
            next.push(shelf.clone());
            Ok(())
        }),
        Mutation::RenameShelf { shelf_id, title } => edited(shelves, |next| {
            shelf_mut(next, *shelf_id)?.title = title.clone();
            Ok(())
        }),
        Mutation::RemoveShelf { shelf_id } => edited(shelves, |next| {
            let position = next
                .iter()
                .position(|s| s.id == *shelf_id)
                .ok_or(MutationError::ShelfNotFound(*shelf_id))?;
            next.remove(position);
            Ok(())
        }),
        Mutation::AddItem {
            shelf_id,
            item,
            index,
        } => edited(shelves, |next| {
            if contains_item(next, item.id()) {
                return Err(MutationError::DuplicateId(item.id()));
            }
            let items = &mut shelf_mut(next, *shelf_id)?.items;
            match index {
                Some(index) => items.insert((*index).min(items.len()), item.clone()),
                None => items.push(item.clone()),
            }
            Ok(())
        }),
        Mutation::ReplaceItem { shelf_id, item } => edited(shelves, |next| {
            let shelf = shelf_mut(next, *shelf_id)?;
            let position = shelf.position_of(item.id()).ok_or(MutationError::ItemNotFound {
                shelf_id: *shelf_id,
                item_id: item.id(),
            })?;
            shelf.items[position] = item.clone();
            Ok(())
        }),
        Mutation::RemoveItem { shelf_id, item_id } => edited(shelves, |next| {
            let shelf = shelf_mut(next, *shelf_id)?;
            let position = shelf.position_of(*item_id).ok_or(MutationError::ItemNotFound {
                shelf_id: *shelf_id,
                item_id: *item_id,
            })?;
            shelf.items.remove(position);
            Ok(())
        }),
    }
}

/// Run `edit` on a fresh copy of the collection
fn edited<I: Clone, F>(shelves: &[Shelf<I>], edit: F) -> Result<Arc<Vec<Shelf<I>>>, MutationError>
where
    F: FnOnce(&mut Vec<Shelf<I>>) -> Result<(), MutationError>,
{
    let mut next = shelves.to_vec();
    edit(&mut next)?;
    Ok(Arc::new(next))
}

fn shelf_mut<I>(shelves: &mut [Shelf<I>], shelf_id: i64) -> Result<&mut Shelf<I>, MutationError> {
    shelves
        .iter_mut()
        .find(|s| s.id == shelf_id)
        .ok_or(MutationError::ShelfNotFound(shelf_id))
}

fn contains_item<I: ShelfItem>(shelves: &[Shelf<I>], item_id: i64) -> bool {
    shelves
        .iter()
        .any(|s| s.items.iter().any(|i| i.id() == item_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IngredientItem;

    fn bean(id: i64) -> IngredientItem {
        IngredientItem {
            id,
            ..IngredientItem::new(format!("bean {}", id))
        }
    }

    fn fixture() -> Arc<Vec<Shelf<IngredientItem>>> {
        Arc::new(vec![
            Shelf::new(1, "One").with_items(vec![bean(11), bean(12)]),
            Shelf::new(2, "Two"),
        ])
    }

    #[test]
    fn test_add_shelf_appends() {
        let before = fixture();
        let after = apply(&before, &Mutation::AddShelf(Shelf::new(3, "Three"))).unwrap();
        assert_eq!(after.len(), 3);
        assert_eq!(after[2].title, "Three");
        assert_eq!(before.len(), 2);
    }

    #[test]
    fn test_add_shelf_rejects_duplicate_id() {
        let err = apply(&fixture(), &Mutation::AddShelf(Shelf::new(2, "Dup"))).unwrap_err();
        assert_eq!(err, MutationError::DuplicateId(2));
    }

    #[test]
    fn test_rename_and_remove_shelf() {
        let renamed = apply(
            &fixture(),
            &Mutation::RenameShelf {
                shelf_id: 2,
                title: "Renamed".to_string(),
            },
        )
        .unwrap();
        assert_eq!(renamed[1].title, "Renamed");

        let removed = apply(&renamed, &Mutation::RemoveShelf { shelf_id: 1 }).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, 2);

        let err = apply(&removed, &Mutation::RemoveShelf { shelf_id: 1 }).unwrap_err();
        assert_eq!(err, MutationError::ShelfNotFound(1));
    }

    #[test]
    fn test_add_item_append_and_insert() {
        let appended = apply(
            &fixture(),
            &Mutation::AddItem {
                shelf_id: 1,
                item: bean(13),
                index: None,
            },
        )
        .unwrap();
        let ids: Vec<i64> = appended[0].items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![11, 12, 13]);

        let inserted = apply(
            &appended,
            &Mutation::AddItem {
                shelf_id: 1,
                item: bean(14),
                index: Some(1),
            },
        )
        .unwrap();
        let ids: Vec<i64> = inserted[0].items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![11, 14, 12, 13]);
    }

    #[test]
    fn test_item_ids_unique_across_shelves() {
        let err = apply(
            &fixture(),
            &Mutation::AddItem {
                shelf_id: 2,
                item: bean(11),
                index: None,
            },
        )
        .unwrap_err();
        assert_eq!(err, MutationError::DuplicateId(11));
    }

    #[test]
    fn test_replace_item_keeps_position() {
        let mut edited = bean(11);
        edited.name = "Edited".to_string();
        let after = apply(
            &fixture(),
            &Mutation::ReplaceItem {
                shelf_id: 1,
                item: edited,
            },
        )
        .unwrap();
        assert_eq!(after[0].items[0].name, "Edited");
        assert_eq!(after[0].items[1].id, 12);
    }

    #[test]
    fn test_remove_item() {
        let after = apply(
            &fixture(),
            &Mutation::RemoveItem {
                shelf_id: 1,
                item_id: 11,
            },
        )
        .unwrap();
        assert_eq!(after[0].items.len(), 1);

        let err = apply(
            &after,
            &Mutation::RemoveItem {
                shelf_id: 2,
                item_id: 12,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            MutationError::ItemNotFound {
                shelf_id: 2,
                item_id: 12
            }
        );
    }

    #[test]
    fn test_unknown_shelf_move_is_noop() {
        let before = fixture();
        let after = apply(&before, &Mutation::Move(MoveRequest::to_end(9, 0, 1))).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_anchored_move_follows_the_item() {
        let anchored = Mutation::Move(MoveRequest::to_end(1, 1, 2)).anchored(&fixture());
        assert_eq!(
            anchored,
            Mutation::MoveItem {
                source_shelf: 1,
                item_id: 12,
                target_shelf: 2,
                target_index: None
            }
        );

        // Same item, now at the front of its shelf
        let reordered = Arc::new(vec![
            Shelf::new(1, "One").with_items(vec![bean(12), bean(11)]),
            Shelf::new(2, "Two"),
        ]);
        let after = apply(&reordered, &anchored).unwrap();
        let ids: Vec<i64> = after[0].items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![11]);
        assert_eq!(after[1].items[0].id, 12);
    }

    #[test]
    fn test_anchored_move_of_missing_item_fails() {
        let anchored = Mutation::Move(MoveRequest::to_end(1, 0, 2)).anchored(&fixture());
        let other = Arc::new(vec![
            Shelf::new(1, "One").with_items(vec![bean(21)]),
            Shelf::new(2, "Two"),
        ]);

        let err = apply(&other, &anchored).unwrap_err();
        assert_eq!(
            err,
            MutationError::ItemNotFound {
                shelf_id: 1,
                item_id: 11
            }
        );
    }

    #[test]
    fn test_anchoring_leaves_other_mutations_alone() {
        let rename = Mutation::RenameShelf {
            shelf_id: 1,
            title: "x".to_string(),
        };
        assert_eq!(rename.clone().anchored(&fixture()), rename);

        let empty_slot = Mutation::Move(MoveRequest::to_end(2, 0, 1));
        assert_eq!(empty_slot.clone().anchored(&fixture()), empty_slot);
    }
}
