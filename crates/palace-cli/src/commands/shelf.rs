//! Shelf command handlers

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;

use palace_core::{CollectionHandle, ShelfItem, Store};

use crate::output::Output;
use crate::prompt::confirm;

/// Which collection a command acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    /// Coffee beans
    #[value(alias = "ingredients")]
    Cafe,
    /// Albums
    #[value(alias = "media")]
    Audio,
}

/// List every shelf of a collection with its items
pub fn list(store: &Store, kind: Kind, output: &Output) -> Result<()> {
    match kind {
        Kind::Cafe => output.print_ingredient_shelves(&store.ingredients().shelves()),
        Kind::Audio => output.print_media_shelves(&store.media().shelves()),
    }
    Ok(())
}

/// Create a shelf at the end of a collection
pub fn add(store: &Store, kind: Kind, title: Option<String>, output: &Output) -> Result<()> {
    let id = match kind {
        Kind::Cafe => add_to(store.ingredients(), title),
        Kind::Audio => add_to(store.media(), title),
    }
    .context("Failed to create shelf")?;

    output.success(&format!("Created shelf {}", id));
    if output.is_quiet() {
        println!("{}", id);
    }
    Ok(())
}

fn add_to<I: ShelfItem>(handle: CollectionHandle<'_, I>, title: Option<String>) -> Result<i64> {
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| I::NEW_SHELF_TITLE.to_string());
    Ok(handle.add_shelf(title)?)
}

/// Rename a shelf
pub fn rename(store: &Store, kind: Kind, shelf_id: i64, title: String, output: &Output) -> Result<()> {
    match kind {
        Kind::Cafe => store.ingredients().rename_shelf(shelf_id, title.as_str()),
        Kind::Audio => store.media().rename_shelf(shelf_id, title.as_str()),
    }
    .context("Failed to rename shelf")?;

    output.success(&format!("Renamed shelf {} to '{}'", shelf_id, title));
    Ok(())
}

/// Delete a shelf and everything on it
pub fn delete(store: &Store, kind: Kind, shelf_id: i64, yes: bool, output: &Output) -> Result<()> {
    let (title, count) = match kind {
        Kind::Cafe => summary(store.ingredients(), shelf_id),
        Kind::Audio => summary(store.media(), shelf_id),
    }?;

    if !yes && output.should_prompt() {
        println!("Delete shelf: [{}] {} ({} item(s))", shelf_id, title, count);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    match kind {
        Kind::Cafe => store.ingredients().delete_shelf(shelf_id),
        Kind::Audio => store.media().delete_shelf(shelf_id),
    }
    .context("Failed to delete shelf")?;

    output.success(&format!("Deleted shelf {}", shelf_id));
    Ok(())
}

fn summary<I: ShelfItem>(handle: CollectionHandle<'_, I>, shelf_id: i64) -> Result<(String, usize)> {
    handle
        .shelf(shelf_id)
        .map(|shelf| (shelf.title, shelf.items.len()))
        .ok_or_else(|| anyhow!("No shelf with id {}", shelf_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use palace_core::{DurableStore, MemoryBackend};

    async fn store() -> Store {
        let store = Store::with_durable(DurableStore::new(MemoryBackend::new()));
        store.ready().await;
        store
    }

    #[tokio::test]
    async fn test_add_uses_collection_default_title() {
        let store = store().await;
        let output = Output::new(OutputFormat::Json);

        add(&store, Kind::Audio, None, &output).unwrap();
        add(&store, Kind::Cafe, Some("  ".to_string()), &output).unwrap();

        assert_eq!(store.media().shelves().last().unwrap().title, "New Genre");
        assert_eq!(store.ingredients().shelves().last().unwrap().title, "New Shelf");
    }

    #[tokio::test]
    async fn test_delete_unknown_shelf_fails() {
        let store = store().await;
        let output = Output::new(OutputFormat::Json);

        assert!(delete(&store, Kind::Cafe, 999, true, &output).is_err());
        delete(&store, Kind::Cafe, 2, true, &output).unwrap();
        assert_eq!(store.ingredients().shelves().len(), 1);
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(Kind::from_str("ingredients", true).unwrap(), Kind::Cafe);
        assert_eq!(Kind::from_str("media", true).unwrap(), Kind::Audio);
        assert_eq!(Kind::from_str("audio", true).unwrap(), Kind::Audio);
    }
}
